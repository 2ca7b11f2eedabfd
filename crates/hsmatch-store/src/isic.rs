//! ISIC industry code → HS tariff line mapping.

use std::collections::HashMap;
use std::path::Path;

use hsmatch_core::IsicConstraint;
use tracing::debug;

use crate::StoreError;
use crate::tables::{ISIC_FILE, read_optional};

#[derive(Debug, Clone, Default)]
pub struct IsicTable {
    codes: HashMap<String, Vec<String>>,
}

impl IsicTable {
    pub fn new(codes: HashMap<String, Vec<String>>) -> Self {
        Self { codes }
    }

    /// Load `isic.json` from `data_dir`; a missing file gives an empty table.
    pub fn load(data_dir: &Path) -> Result<Self, StoreError> {
        let codes = match read_optional(&data_dir.join(ISIC_FILE))? {
            Some(text) => serde_json::from_str(&text)?,
            None => HashMap::new(),
        };
        Ok(Self { codes })
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// The HS prefixes an ISIC code implies. An unknown code gives an empty
    /// constraint carrying the code.
    pub fn constraint(&self, isic_code: &str) -> IsicConstraint {
        match self.codes.get(isic_code) {
            Some(codes) => IsicConstraint::from_codes(isic_code, codes),
            None => {
                debug!(isic = isic_code, "unknown ISIC code, constraint is empty");
                IsicConstraint {
                    code: isic_code.to_string(),
                    ..IsicConstraint::default()
                }
            }
        }
    }
}
