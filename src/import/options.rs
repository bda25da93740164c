//! Import options, the configured choice per conflict class

use crate::models::{ImportChoice, ImportOption};
use crate::resolve::ResolveError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Configured [`ImportChoice`] per [`ImportOption`]
///
/// Options that are not set read as [`ImportChoice::None`], meaning the
/// choice is made per conflict by a selector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOptions {
    choices: BTreeMap<ImportOption, ImportChoice>,
}

impl ImportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, option: ImportOption) -> ImportChoice {
        self.choices.get(&option).copied().unwrap_or_default()
    }

    /// Set the choice for an option, the choice must be allowed for the option
    pub fn set(&mut self, option: ImportOption, choice: ImportChoice) -> Result<(), ResolveError> {
        if !option.allows(choice) {
            return Err(ResolveError::IllegalChoice { option, choice });
        }
        if choice == ImportChoice::None {
            self.choices.remove(&option);
        } else {
            self.choices.insert(option, choice);
        }
        Ok(())
    }

    /// Builder form of [`ImportOptions::set`]
    pub fn with(mut self, option: ImportOption, choice: ImportChoice) -> Result<Self, ResolveError> {
        self.set(option, choice)?;
        Ok(self)
    }

    /// Options with a configured choice
    pub fn iter(&self) -> impl Iterator<Item = (ImportOption, ImportChoice)> + '_ {
        self.choices.iter().map(|(o, c)| (*o, *c))
    }
}

/// Import options shared by a context and the resolvers built from it.
///
/// Resolvers read the options on every query, so a choice set through any
/// handle applies to the rest of the session.
#[derive(Debug, Clone, Default)]
pub struct SharedOptions(Arc<RwLock<ImportOptions>>);

impl SharedOptions {
    pub fn new(options: ImportOptions) -> Self {
        Self(Arc::new(RwLock::new(options)))
    }

    pub fn get(&self, option: ImportOption) -> ImportChoice {
        self.read().get(option)
    }

    /// Copy of the current options
    pub fn snapshot(&self) -> ImportOptions {
        self.read().clone()
    }

    pub fn replace(&self, options: ImportOptions) {
        *self.write() = options;
    }

    /// Use a choice for all later decisions on the option
    pub fn remember(&self, option: ImportOption, choice: ImportChoice) -> Result<(), ResolveError> {
        self.write().set(option, choice)
    }

    fn read(&self) -> RwLockReadGuard<'_, ImportOptions> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ImportOptions> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl From<ImportOptions> for SharedOptions {
    fn from(options: ImportOptions) -> Self {
        Self::new(options)
    }
}
