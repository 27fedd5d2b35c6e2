// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The persisted identity and configuration of one managed server process.

use serde::{Deserialize, Serialize};

/// Configuration for a single instance, this is the form that is persisted.
///
/// Runtime state and the OS process handle are deliberately not fields here,
///   they live with the Supervisor that owns the instance. On load every
///   instance is therefore Inactive by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub arguments: String,
    #[serde(default)]
    pub branch: Branch,
}

impl InstanceRecord {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        let path = path.into();
        let branch = Branch::for_path(&path);

        Self {
            name: name.into(),
            path,
            arguments: arguments.into(),
            branch,
        }
    }

    /// The default field values for a freshly created instance
    pub fn placeholder() -> Self {
        Self::new("New Instance Name", "SRCDS Path", "SRCDS Launch Arguments")
    }

    /// Re-derive the branch from the executable path
    pub fn rebranch(&mut self) {
        self.branch = Branch::for_path(&self.path);
    }

    /// Render the display label for this instance in the given state.
    ///
    /// The label is a pure function of (name, branch, state), it is always
    ///   recomputed whole so the display collaborator never sees a partial
    ///   update.
    pub fn title(&self, state: State) -> String {
        let mut title = self.name.clone();

        if self.branch == Branch::X86_64 {
            title.push_str(" (x86-64)");
        }

        match state {
            State::Inactive => (),
            State::Running => title.push_str(" [RUNNING]"),
            State::Errored => title.push_str(" [ERRORED]"),
        }

        title
    }
}

/// Cosmetic classification of the server binary, affects display only
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Branch {
    Unknown,
    X86_64,
}

impl Branch {
    pub fn for_path(path: &str) -> Self {
        if path.contains("64") {
            Branch::X86_64
        } else {
            Branch::Unknown
        }
    }
}

impl Default for Branch {
    fn default() -> Self {
        Branch::Unknown
    }
}

impl From<String> for Branch {
    fn from(branch: String) -> Self {
        match branch.as_str() {
            "x86-64" => Branch::X86_64,
            _ => Branch::Unknown,
        }
    }
}

impl From<Branch> for String {
    fn from(branch: Branch) -> Self {
        match branch {
            Branch::X86_64 => "x86-64".to_string(),
            Branch::Unknown => String::new(),
        }
    }
}

/// Runtime state of an instance, owned exclusively by its Supervisor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Inactive,
    Running,
    Errored,
}

impl Default for State {
    fn default() -> Self {
        State::Inactive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_is_derived_from_the_path() {
        assert_eq!(Branch::for_path("/srv/tf2/srcds"), Branch::Unknown);
        assert_eq!(Branch::for_path("/srv/gmod/srcds64"), Branch::X86_64);
        assert_eq!(Branch::for_path("C:\\servers\\x64\\srcds.exe"), Branch::X86_64);
    }

    #[test]
    fn titles_follow_name_branch_and_state() {
        let record = InstanceRecord::new("gmod", "/srv/gmod/srcds64", "-console");
        assert_eq!(record.title(State::Inactive), "gmod (x86-64)");
        assert_eq!(record.title(State::Running), "gmod (x86-64) [RUNNING]");
        assert_eq!(record.title(State::Errored), "gmod (x86-64) [ERRORED]");

        let record = InstanceRecord::new("tf2", "/srv/tf2/srcds", "");
        assert_eq!(record.title(State::Inactive), "tf2");
        assert_eq!(record.title(State::Running), "tf2 [RUNNING]");
    }

    #[test]
    fn branch_tolerates_legacy_empty_strings() {
        let json = r#"{"name":"a","path":"/srv/a/srcds","arguments":"","branch":""}"#;
        let record: InstanceRecord = serde_json::from_str(json).expect("legacy record");
        assert_eq!(record.branch, Branch::Unknown);

        let json = r#"{"name":"b","path":"/srv/b/srcds","arguments":"","branch":"x86-64"}"#;
        let record: InstanceRecord = serde_json::from_str(json).expect("branched record");
        assert_eq!(record.branch, Branch::X86_64);
    }

    #[test]
    fn records_round_trip_without_runtime_fields() {
        let record = InstanceRecord::new("gmod", "/srv/gmod/srcds64", "-console +maxplayers 16");

        let json = serde_json::to_string(&record).expect("serialize");
        assert!(!json.contains("state"));
        assert!(!json.contains("pid"));

        let back: InstanceRecord = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, record);
    }
}
