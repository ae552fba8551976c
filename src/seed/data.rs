use anyhow::{anyhow, Result};
use log::info;

use crate::model::{Association, Id, Record, Tool, ToolType};
use crate::store::traits::{RecordStore, Store, StoreError};

struct SeedTool {
    name: &'static str,
    source: &'static str,
    subgroup_size: &'static str,
    participants: (i32, i32, i32),
    duration: i32,
    cost: f64,
    materials: Option<&'static str>,
    types: &'static [&'static str],
    tags: &'static [&'static str],
    published: bool,
}

const TYPES: &[&str] = &["Discussion", "Reflection", "Icebreaker", "Assessment"];

const TOOLS: &[SeedTool] = &[
    SeedTool {
        name: "Jigsaw",
        source: "Aronson, The Jigsaw Classroom",
        subgroup_size: "4-6",
        participants: (8, 24, 40),
        duration: 45,
        cost: 0.0,
        materials: Some("Handouts for each expert group"),
        types: &["Discussion"],
        tags: &["Cooperative Learning", "Peer Teaching"],
        published: true,
    },
    SeedTool {
        name: "Fishbowl",
        source: "Facilitator's handbook",
        subgroup_size: "whole group",
        participants: (10, 20, 35),
        duration: 30,
        cost: 0.0,
        materials: None,
        types: &["Discussion"],
        tags: &["Debate"],
        published: true,
    },
    SeedTool {
        name: "Muddiest Point",
        source: "Angelo & Cross, Classroom Assessment Techniques",
        subgroup_size: "1",
        participants: (1, 25, 200),
        duration: 5,
        cost: 0.0,
        materials: Some("Index cards"),
        types: &["Reflection", "Assessment"],
        tags: &["Feedback"],
        published: false,
    },
    SeedTool {
        name: "Two Truths and a Lie",
        source: "Community practice",
        subgroup_size: "3-5",
        participants: (3, 15, 30),
        duration: 15,
        cost: 0.0,
        materials: None,
        types: &["Icebreaker"],
        tags: &["Warm-up"],
        published: false,
    },
];

fn rejected(err: StoreError) -> anyhow::Error {
    match err {
        StoreError::Infrastructure(err) => err,
        rejected => anyhow!("seed record rejected: {}", rejected),
    }
}

/// Populate an empty store with a small demonstration catalogue
pub async fn load_seed_data<S: Store + ?Sized>(store: &S) -> Result<()> {
    let mut type_ids: Vec<(&str, Id)> = Vec::new();
    for &description in TYPES {
        let tool_type = RecordStore::<ToolType>::insert(store, ToolType::new(description))
            .await
            .map_err(rejected)?;
        type_ids.push((description, tool_type.id()));
    }

    let mut tool_ids = Vec::new();
    for seed in TOOLS {
        let mut tool = Tool::new(seed.name, seed.source, seed.subgroup_size);
        (tool.minimum_participants, tool.suggested_participants, tool.maximum_participants) = seed.participants;
        tool.duration = seed.duration;
        tool.cost = seed.cost;
        tool.materials = seed.materials.map(str::to_string);
        tool.published = seed.published;

        let tool = RecordStore::<Tool>::insert(store, tool).await.map_err(rejected)?;

        for type_name in seed.types {
            if let Some((_, type_id)) = type_ids.iter().find(|(name, _)| name == type_name) {
                store.link(Association::ToolType, tool.id, *type_id).await?;
            }
        }
        for raw_tag in seed.tags {
            let tag = store.upsert_tag(raw_tag).await?;
            store.link(Association::Tag, tool.id, tag.id).await?;
        }
        tool_ids.push(tool.id);
    }

    // Chain neighbouring tools together as related suggestions
    for pair in tool_ids.windows(2) {
        store.link(Association::RelatedTool, pair[0], pair[1]).await?;
    }

    info!(
        "Seeded {} tool types and {} tools",
        type_ids.len(),
        tool_ids.len()
    );
    Ok(())
}
