#[cfg(feature = "user")]
use serde::{Deserialize, Serialize};

/// One unwound frame as delivered by the trace stream
#[cfg_attr(feature = "user", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RawFrame {
    pub address: u64,
    /// method name known at capture time, may be empty
    #[cfg_attr(feature = "user", serde(default))]
    pub name: String,
    /// path of the object the address belongs to
    #[cfg_attr(feature = "user", serde(default, skip_serializing_if = "Option::is_none"))]
    pub module: Option<String>,
}

impl RawFrame {
    pub fn new(address: u64, name: &str) -> Self {
        Self {
            address,
            name: name.to_owned(),
            module: None,
        }
    }

    pub fn with_module(mut self, module: &str) -> Self {
        self.module = Some(module.to_owned());
        self
    }
}

/// A sampling interrupt. Frames are ordered innermost first,
/// each frame's caller being the next one.
#[cfg_attr(feature = "user", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SampleEvent {
    pub pid: u32,
    pub frames: Vec<RawFrame>,
}

impl SampleEvent {
    pub fn new(pid: u32, frames: Vec<RawFrame>) -> Self {
        Self { pid, frames }
    }
}
