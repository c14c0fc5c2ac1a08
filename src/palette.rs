use alloc::borrow::Cow;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// Display names and colours of object classes.
///
/// Lookups wrap around when a class index exceeds the table, so every index
/// gets a name and a colour.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct ClassPalette {
    /// Class names, indexed by class.
    pub names: Vec<String>,
    /// RGB colours, indexed by class.
    pub colours: Vec<[u8; 3]>,
}

impl ClassPalette {
    /// Create a palette from names and RGB colours.
    pub fn new(names: Vec<String>, colours: Vec<[u8; 3]>) -> Self {
        Self { names, colours }
    }

    /// Name of a class.
    pub fn name(&self, class_idx: u32) -> Cow<'_, str> {
        if self.names.is_empty() {
            return Cow::Owned(format!("class{class_idx}"));
        }
        let i = class_idx as usize % self.names.len();
        Cow::Borrowed(&self.names[i])
    }

    /// RGB colour of a class.
    pub fn colour(&self, class_idx: u32) -> [u8; 3] {
        if self.colours.is_empty() {
            return [255, 255, 255];
        }
        self.colours[class_idx as usize % self.colours.len()]
    }
}

impl Default for ClassPalette {
    fn default() -> Self {
        let names = ["cube", "sphere", "cone", "cylinder", "torus"]
            .iter()
            .map(|n| String::from(*n))
            .collect();
        let colours = alloc::vec![
            [255, 0, 0],
            [0, 255, 0],
            [0, 0, 255],
            [0, 255, 255],
            [255, 0, 255],
        ];
        Self { names, colours }
    }
}
