use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_KEY_LENGTH: usize = 128;
pub const MAX_VALUE_SIZE: usize = 64 * 1024;

/// Small key/value persistence on the device (shell-backed). Used for the
/// feed settings; never for anything the server owns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum StorageOperation {
    Read { key: String },
    Write { key: String, value: Vec<u8> },
}

impl Operation for StorageOperation {
    type Output = StorageResult;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum StorageOutput {
    Value(Option<Vec<u8>>),
    Written,
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum StorageError {
    #[error("invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("value too large: {size} bytes exceeds maximum of {max} bytes")]
    ValueTooLarge { size: usize, max: usize },

    #[error("storage unavailable: {reason}")]
    Unavailable { reason: String },
}

pub type StorageResult = Result<StorageOutput, StorageError>;

fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.trim().is_empty() {
        return Err(StorageError::InvalidKey {
            key: key.to_string(),
            reason: "key cannot be empty".to_string(),
        });
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(StorageError::InvalidKey {
            key: key.chars().take(32).collect(),
            reason: format!("key exceeds maximum length of {MAX_KEY_LENGTH} bytes"),
        });
    }
    if key.chars().any(char::is_control) {
        return Err(StorageError::InvalidKey {
            key: key.to_string(),
            reason: "key contains control characters".to_string(),
        });
    }
    Ok(())
}

pub struct Storage<Ev> {
    context: CapabilityContext<StorageOperation, Ev>,
}

impl<Ev> Capability<Ev> for Storage<Ev> {
    type Operation = StorageOperation;
    type MappedSelf<MappedEv> = Storage<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static,
    {
        Storage::new(self.context.map_event(f))
    }
}

impl<Ev> Storage<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<StorageOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn read<F>(&self, key: impl Into<String>, make_event: F)
    where
        F: FnOnce(Result<Option<Vec<u8>>, StorageError>) -> Ev + Send + 'static,
    {
        let key = key.into();
        if let Err(e) = validate_key(&key) {
            self.context.update_app(make_event(Err(e)));
            return;
        }

        let context = self.context.clone();
        self.context.spawn(async move {
            let result = match context.request_from_shell(StorageOperation::Read { key }).await {
                Ok(StorageOutput::Value(value)) => Ok(value),
                Ok(StorageOutput::Written) => Err(StorageError::Unavailable {
                    reason: "unexpected write acknowledgement".into(),
                }),
                Err(e) => Err(e),
            };
            context.update_app(make_event(result));
        });
    }

    pub fn write<F>(&self, key: impl Into<String>, value: Vec<u8>, make_event: F)
    where
        F: FnOnce(Result<(), StorageError>) -> Ev + Send + 'static,
    {
        let key = key.into();
        if let Err(e) = validate_key(&key) {
            self.context.update_app(make_event(Err(e)));
            return;
        }
        if value.len() > MAX_VALUE_SIZE {
            self.context.update_app(make_event(Err(StorageError::ValueTooLarge {
                size: value.len(),
                max: MAX_VALUE_SIZE,
            })));
            return;
        }

        let context = self.context.clone();
        self.context.spawn(async move {
            let result = match context
                .request_from_shell(StorageOperation::Write { key, value })
                .await
            {
                Ok(_) => Ok(()),
                Err(e) => Err(e),
            };
            context.update_app(make_event(result));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_validation_empty() {
        assert!(matches!(
            validate_key(""),
            Err(StorageError::InvalidKey { .. })
        ));
        assert!(validate_key("   ").is_err());
    }

    #[test]
    fn test_key_validation_too_long() {
        let key = "k".repeat(MAX_KEY_LENGTH + 1);
        assert!(validate_key(&key).is_err());
    }

    #[test]
    fn test_key_validation_control_chars() {
        assert!(validate_key("feed\nsettings").is_err());
    }

    #[test]
    fn test_key_validation_valid() {
        assert!(validate_key("feed_settings_v1").is_ok());
    }
}
