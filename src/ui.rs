// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Collaborator interfaces for surfacing supervisor state to an operator.
//!
//! Rules:
//!   - implementations are best-effort, they may never block or fail a transition
//!   - display text is always handed over whole, never patched incrementally

use log::{debug, info, warn};

/// Fire-and-forget failure notifications, e.g. a desktop popup
pub trait Notify: Send + Sync {
    fn notify(&self, title: &str, message: &str);
}

/// Label and name-list updates for whatever is rendering the instances
pub trait StatusDisplay: Send + Sync {
    /// Replace the display label for one instance
    fn set_display(&self, name: &str, text: &str);

    /// Replace the whole ordered list of instance names
    fn set_names(&self, names: &[String]);
}

/// Notifier that writes to the log instead of popping anything up
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notify for LogNotifier {
    fn notify(&self, title: &str, message: &str) {
        warn!("{} {}", title, message);
    }
}

/// Display that writes label changes to the log
#[derive(Debug, Default)]
pub struct LogDisplay;

impl StatusDisplay for LogDisplay {
    fn set_display(&self, name: &str, text: &str) {
        info!("[{}] {}", name, text);
    }

    fn set_names(&self, names: &[String]) {
        debug!("instances: {}", names.join(", "));
    }
}
