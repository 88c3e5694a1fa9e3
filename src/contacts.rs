use crate::error::ContactError;

/// Ordered emergency contacts. Duplicates are allowed.
#[derive(Clone, Debug, Default)]
pub struct ContactStore {
    entries: Vec<String>,
}

impl ContactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries kept verbatim and unvalidated, as a persisted list could come back.
    #[cfg(test)]
    pub fn from_raw<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }

    pub fn add(&mut self, input: &str) -> Result<(), ContactError> {
        let candidate = input.trim();
        if candidate.is_empty() || !alert_core::is_valid_contact(candidate) {
            return Err(ContactError::InvalidAddress(input.to_owned()));
        }
        self.entries.push(candidate.to_owned());
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<String, ContactError> {
        if index >= self.entries.len() {
            return Err(ContactError::NoSuchContact(index));
        }
        Ok(self.entries.remove(index))
    }

    pub fn list(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
