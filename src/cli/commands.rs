//! Subcommand implementations.

use super::Commands;
use crate::engine::{EngineOptions, MutationEngine};
use crate::forest::{Collection, Forest, WindowId, WireCollection};
use crate::host::SimulatedHost;
use crate::persistence::{FileKv, KeyValueStore, MemoryKv};
use crate::protocol::{LifecycleEvent, Request};
use crate::store::HierarchyStore;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt::Write as _;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use tabstree_config::Config;

/// One line of a replay file
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ReplayLine {
    Event(LifecycleEvent),
    Request(Request),
}

/// Run a parsed subcommand
pub async fn execute(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Show { window, json } => show(config, window, json).await,
        Commands::Replay { events, persist } => replay(config, &events, persist).await,
        Commands::Reset { yes } => reset(config, yes).await,
    }
}

fn file_store(config: &Config) -> HierarchyStore {
    let dir = config.storage_dir();
    log::debug!("Using storage directory {}", dir.display());
    HierarchyStore::with_backend(Box::new(FileKv::new(dir)), &config.storage_key)
}

async fn show(config: &Config, window: Option<WindowId>, json: bool) -> Result<()> {
    let store = &file_store(config);
    let mut collection = store
        .run_exclusive(|guard| async move { store.get(&guard) })
        .await;

    if let Some(window_id) = window {
        let forest = collection
            .get(window_id)
            .cloned()
            .with_context(|| format!("window {} is not tracked", window_id))?;
        collection = Collection::new();
        collection.insert(window_id, forest);
    }

    if json {
        let wire = WireCollection::from(&collection);
        println!("{}", serde_json::to_string_pretty(&wire)?);
    } else {
        print!("{}", render_collection(&collection));
    }
    Ok(())
}

async fn replay(config: &Config, events: &Path, persist: bool) -> Result<()> {
    let contents = std::fs::read_to_string(events)
        .with_context(|| format!("Failed to read {}", events.display()))?;

    let backend: Box<dyn KeyValueStore> = if persist {
        Box::new(FileKv::new(config.storage_dir()))
    } else {
        Box::new(MemoryKv::new())
    };
    let host = Arc::new(SimulatedHost::new());
    let store = Arc::new(HierarchyStore::with_backend(backend, &config.storage_key));
    let engine = MutationEngine::new(store, host.clone(), EngineOptions::from(config));

    for (number, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parsed: ReplayLine = serde_json::from_str(line)
            .with_context(|| format!("{}:{}: invalid event", events.display(), number + 1))?;

        match parsed {
            ReplayLine::Event(event) => {
                host.apply_event(&event);
                engine.dispatch(event).await;
            }
            ReplayLine::Request(request) => {
                let response = engine.handle_request(request).await;
                println!("{}", serde_json::to_string(&response)?);
            }
        }
    }

    print!("{}", render_collection(&engine.snapshot().await));
    Ok(())
}

async fn reset(config: &Config, yes: bool) -> Result<()> {
    let dir = config.storage_dir();
    if !yes {
        print!(
            "Delete the tab hierarchy stored in {}? [y/N] ",
            dir.display()
        );
        io::stdout().flush()?;

        let mut response = String::new();
        io::stdin().read_line(&mut response)?;
        let response = response.trim().to_lowercase();
        if response != "y" && response != "yes" {
            println!("Reset cancelled.");
            return Ok(());
        }
    }

    let store = &file_store(config);
    store
        .run_exclusive(|guard| async move { store.clear(&guard) })
        .await
        .context("Failed to clear stored hierarchy")?;
    println!("Stored hierarchy cleared.");
    Ok(())
}

/// Indented text view of every window's forest
pub fn render_collection(collection: &Collection) -> String {
    let mut out = String::new();
    for (window_id, forest) in collection.iter() {
        let _ = writeln!(out, "window {} ({} tabs)", window_id, forest.len());
        render_forest(&mut out, forest);
    }
    out
}

fn render_forest(out: &mut String, forest: &Forest) {
    for entry in forest.iter() {
        let depth = forest.depth(entry.tab) + 1;
        let _ = writeln!(out, "{}{}", "  ".repeat(depth), entry.tab);
    }
}
