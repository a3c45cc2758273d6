//! Subcommand bodies, kept apart from argument parsing for testing.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use calscope_core::{Clock, FixedClock, FocusTarget, IdentifierPair, SystemClock};
use calscope_resolver::{InMemoryLookup, LookupFixtures, ResolverConfig, ScopeResolver};
use calscope_settings::CalscopeSettings;
use calscope_store::{ScopeAction, ScopeStore};
use chrono::NaiveDate;
use tracing::debug;

/// Inputs of `calscope resolve`.
#[derive(Debug)]
pub struct ResolveOptions {
    /// Fixture JSON file.
    pub fixtures: PathBuf,
    /// Pinned "today"; the local date when absent.
    pub today: Option<NaiveDate>,
    /// Run navigate-to-element after resolving.
    pub navigate: bool,
}

/// Strictly decode `token` into its identifier pair.
pub fn decode(token: &str) -> Result<IdentifierPair> {
    let target: FocusTarget = token
        .parse()
        .with_context(|| format!("invalid focus token: {token}"))?;
    Ok(target.to_identifier_pair())
}

/// Run a focus resolution against fixtures and return every dispatched action.
pub async fn resolve(
    token: &str,
    options: &ResolveOptions,
    settings: &CalscopeSettings,
) -> Result<Vec<ScopeAction>> {
    let target: FocusTarget = token
        .parse()
        .with_context(|| format!("invalid focus token: {token}"))?;
    let fixtures = LookupFixtures::from_path(&options.fixtures)
        .with_context(|| format!("failed to load fixtures: {}", options.fixtures.display()))?;

    let clock: Arc<dyn Clock> = match options.today {
        Some(date) => Arc::new(FixedClock(date)),
        None => Arc::new(SystemClock),
    };
    let store = Arc::new(ScopeStore::new());
    let mut log = store.subscribe_actions();
    let resolver = ScopeResolver::new(
        Arc::clone(&store),
        Arc::new(InMemoryLookup::from(fixtures)),
        clock,
        ResolverConfig::from_settings(settings),
    );

    let resolution = resolver.resolve_focus(target.clone()).await;
    debug!(?resolution, "focus resolved");
    if options.navigate {
        let placed = resolver.resolve_navigate_to_element(target).await;
        debug!(placed, "navigate-to-element finished");
    }

    let mut actions = Vec::new();
    while let Ok(action) = log.try_recv() {
        actions.push(action);
    }
    Ok(actions)
}
