use crate::domain::models::ManualBlock;
use crate::infrastructure::error::InfraError;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

pub trait ManualBlockRepository: Send + Sync {
    fn append(&self, week_key: &str, block: ManualBlock) -> Result<(), InfraError>;
    fn remove_at(&self, week_key: &str, index: usize) -> Result<Option<ManualBlock>, InfraError>;
    fn list(&self, week_key: &str) -> Result<Vec<ManualBlock>, InfraError>;
    fn clear(&self, week_key: &str) -> Result<(), InfraError>;
}

#[derive(Debug, Default)]
pub struct InMemoryManualBlockRepository {
    blocks: Mutex<HashMap<String, Vec<ManualBlock>>>,
}

impl InMemoryManualBlockRepository {
    fn normalized_key(week_key: &str) -> Result<String, InfraError> {
        let normalized = week_key.trim();
        if normalized.is_empty() {
            return Err(InfraError::InvalidInput(
                "week key must not be empty".to_string(),
            ));
        }
        Ok(normalized.to_string())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Vec<ManualBlock>>>, InfraError> {
        self.blocks
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("manual block lock poisoned: {error}")))
    }
}

impl ManualBlockRepository for InMemoryManualBlockRepository {
    fn append(&self, week_key: &str, block: ManualBlock) -> Result<(), InfraError> {
        block.validate().map_err(InfraError::InvalidInput)?;
        let week_key = Self::normalized_key(week_key)?;
        self.lock()?.entry(week_key).or_default().push(block);
        Ok(())
    }

    fn remove_at(&self, week_key: &str, index: usize) -> Result<Option<ManualBlock>, InfraError> {
        let week_key = Self::normalized_key(week_key)?;
        let mut blocks = self.lock()?;
        let Some(week) = blocks.get_mut(&week_key) else {
            return Ok(None);
        };
        if index >= week.len() {
            return Ok(None);
        }
        Ok(Some(week.remove(index)))
    }

    fn list(&self, week_key: &str) -> Result<Vec<ManualBlock>, InfraError> {
        let week_key = Self::normalized_key(week_key)?;
        Ok(self.lock()?.get(&week_key).cloned().unwrap_or_default())
    }

    fn clear(&self, week_key: &str) -> Result<(), InfraError> {
        let week_key = Self::normalized_key(week_key)?;
        self.lock()?.remove(&week_key);
        Ok(())
    }
}
