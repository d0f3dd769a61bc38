use serde::{Deserialize, Serialize};
use std::fmt;

/// A page of the VM-creation wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    #[default]
    Start,
    OsSelect,
    MacBoot,
    LinuxBoot,
    WindowsBoot,
    OtherBoot,
    Hardware,
    Drives,
    Sharing,
    /// Terminal step; the selection is ready to compile.
    Summary,
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = match self {
            WizardStep::Start => "Start",
            WizardStep::OsSelect => "Operating System",
            WizardStep::MacBoot => "macOS",
            WizardStep::LinuxBoot => "Linux",
            WizardStep::WindowsBoot => "Windows",
            WizardStep::OtherBoot => "Other",
            WizardStep::Hardware => "Hardware",
            WizardStep::Drives => "Storage",
            WizardStep::Sharing => "Shared Directory",
            WizardStep::Summary => "Summary",
        };
        f.write_str(title)
    }
}
