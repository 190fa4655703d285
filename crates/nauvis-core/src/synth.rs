//! Record synthesis.
//!
//! Builds the randomized payloads of event and stats records. Every draw
//! goes through the supplied [`RandomSource`], in a fixed order, so a
//! seeded source reproduces the same records.

use std::collections::BTreeMap;

use nauvis_types::{EventKind, EventRecord, GameEvent, PlayerInfo, Position, SessionId, StatsRecord};

use crate::config::EmitterConfig;
use crate::random::RandomSource;

/// Decimal places kept on stats quantities.
pub const QUANTITY_DECIMALS: i32 = 5;

/// Upper bound of a sampled item quantity.
const ITEM_QUANTITY_MAX: f64 = 200.0;

/// Upper bound of a sampled fluid quantity.
const FLUID_QUANTITY_MAX: f64 = 500.0;

/// Construction positions are drawn from `[0, MAP_EXTENT)` on both axes.
const MAP_EXTENT: f64 = 100.0;

/// Player snapshot positions are drawn from `[-PLAYER_RANGE, PLAYER_RANGE)`.
const PLAYER_RANGE: f64 = 100.0;

/// Maximum character health.
const MAX_HEALTH: f64 = 250.0;

/// Research duration bounds, in seconds.
const RESEARCH_SECONDS: (f64, f64) = (60.0, 600.0);

/// Hand-craft batch size bounds.
const CRAFT_COUNT: (u32, u32) = (1, 10);

/// Errors that can occur while synthesizing a record.
#[derive(Debug, thiserror::Error)]
pub enum SynthError {
    /// A catalog list needed by the chosen event kind is empty.
    #[error("catalog list `{list}` is empty")]
    EmptyCatalog {
        /// Name of the empty list.
        list: &'static str,
    },
}

/// Round `value` to `places` decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10_f64.powi(places);
    (value * factor).round() / factor
}

/// Build a random event record at `tick`.
///
/// The event kind is drawn uniformly from [`EventKind::ALL`]; its fields are
/// drawn from the catalog.
///
/// # Errors
///
/// Returns [`SynthError::EmptyCatalog`] if the catalog list the chosen kind
/// needs is empty.
pub fn synthesize_event(
    config: &EmitterConfig,
    session_id: &SessionId,
    tick: u64,
    random: &mut dyn RandomSource,
) -> Result<EventRecord, SynthError> {
    let kind = EventKind::ALL
        .get(random.index(EventKind::ALL.len()))
        .copied()
        .unwrap_or(EventKind::EntityBuilt);

    let catalog = &config.catalog;
    let event = match kind {
        EventKind::EntityBuilt | EventKind::EntityMined => {
            let entity = pick(random, &catalog.entities, "entities")?;
            let position = Position {
                x: round_to(random.uniform(0.0, MAP_EXTENT), 1),
                y: round_to(random.uniform(0.0, MAP_EXTENT), 1),
            };
            let surface = config.session.surface.clone();
            if kind == EventKind::EntityBuilt {
                GameEvent::EntityBuilt {
                    entity,
                    position,
                    surface,
                }
            } else {
                GameEvent::EntityMined {
                    entity,
                    position,
                    surface,
                }
            }
        }
        EventKind::ResearchStarted => GameEvent::ResearchStarted {
            tech_name: pick(random, &catalog.technologies, "technologies")?,
            tech_level: random.int_inclusive(1, catalog.max_tech_level),
        },
        EventKind::ResearchFinished => {
            let tech_name = pick(random, &catalog.technologies, "technologies")?;
            let tech_level = random.int_inclusive(1, catalog.max_tech_level);
            let duration = round_to(random.uniform(RESEARCH_SECONDS.0, RESEARCH_SECONDS.1), 2);
            GameEvent::ResearchFinished {
                tech_name,
                tech_level,
                duration: Some(duration),
            }
        }
        EventKind::ItemCrafted => {
            let item = pick(random, &catalog.craftables, "craftables")?;
            GameEvent::ItemCrafted {
                count: random.int_inclusive(CRAFT_COUNT.0, CRAFT_COUNT.1),
                recipe: item.clone(),
                item,
            }
        }
    };

    Ok(EventRecord {
        session_id: session_id.clone(),
        tick,
        player_index: config.session.player_index,
        event,
    })
}

/// Build the stats record for `tick` in stats cycle `cycle`.
///
/// Each catalog item is independently included in production and in
/// consumption with `item_probability`; each fluid is included in
/// production only with `fluid_probability`. Quantities are rounded to
/// [`QUANTITY_DECIMALS`] places.
pub fn synthesize_stats(
    config: &EmitterConfig,
    session_id: &SessionId,
    tick: u64,
    cycle: u64,
    random: &mut dyn RandomSource,
) -> StatsRecord {
    let emission = &config.emission;
    let mut products_production = BTreeMap::new();
    let mut materials_consumption = BTreeMap::new();

    for item in &config.catalog.items {
        if random.chance(emission.item_probability) {
            products_production.insert(item.clone(), quantity(random, ITEM_QUANTITY_MAX));
        }
        if random.chance(emission.item_probability) {
            materials_consumption.insert(item.clone(), quantity(random, ITEM_QUANTITY_MAX));
        }
    }

    for fluid in &config.catalog.fluids {
        if random.chance(emission.fluid_probability) {
            products_production.insert(fluid.clone(), quantity(random, FLUID_QUANTITY_MAX));
        }
    }

    let player = emission.player_snapshot.then(|| PlayerInfo {
        position: Position {
            x: round_to(random.uniform(-PLAYER_RANGE, PLAYER_RANGE), 1),
            y: round_to(random.uniform(-PLAYER_RANGE, PLAYER_RANGE), 1),
        },
        surface: config.session.surface.clone(),
        health: round_to(random.uniform(0.0, MAX_HEALTH), 1),
    });

    let screenshot_path = emission
        .screenshots
        .then(|| format!("screenshots/{session_id}_{tick}.png"));

    StatsRecord {
        session_id: session_id.clone(),
        cycle,
        tick,
        player,
        screenshot_path,
        products_production,
        materials_consumption,
    }
}

fn quantity(random: &mut dyn RandomSource, max: f64) -> f64 {
    round_to(random.uniform(0.0, max), QUANTITY_DECIMALS)
}

fn pick(
    random: &mut dyn RandomSource,
    items: &[String],
    list: &'static str,
) -> Result<String, SynthError> {
    random
        .pick(items)
        .map(str::to_owned)
        .ok_or(SynthError::EmptyCatalog { list })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::random::{RngSource, ScriptedSource};

    fn session() -> SessionId {
        SessionId::from("nauvis_1700000000_555555")
    }

    fn is_rounded(value: f64, places: i32) -> bool {
        let scaled = value * 10_f64.powi(places);
        (scaled - scaled.round()).abs() < 1e-6
    }

    #[test]
    fn round_to_five_places() {
        assert!((round_to(1.234_567_89, 5) - 1.234_57).abs() < 1e-12);
        assert!((round_to(0.000_004, 5) - 0.0).abs() < 1e-12);
        assert!((round_to(42.0, 5) - 42.0).abs() < 1e-12);
    }

    #[test]
    fn first_sample_selects_event_kind() {
        let config = EmitterConfig::default();
        // 0.5 * 5 = 2.5 -> index 2 -> ResearchStarted
        let mut random = ScriptedSource::new(vec![0.5, 0.0, 0.0]);
        let event = synthesize_event(&config, &session(), 90, &mut random).unwrap();
        assert_eq!(event.tick, 90);
        assert_eq!(event.player_index, 1);
        match event.event {
            GameEvent::ResearchStarted {
                tech_name,
                tech_level,
            } => {
                assert_eq!(tech_name, "automation");
                assert_eq!(tech_level, 1);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn crafted_item_uses_matching_recipe() {
        let config = EmitterConfig::default();
        // 0.9 * 5 = 4.5 -> ItemCrafted; 0.0 -> first craftable; 0.999 -> count 10
        let mut random = ScriptedSource::new(vec![0.9, 0.0, 0.999]);
        let event = synthesize_event(&config, &session(), 30, &mut random).unwrap();
        match event.event {
            GameEvent::ItemCrafted {
                item,
                count,
                recipe,
            } => {
                assert_eq!(item, "iron-gear-wheel");
                assert_eq!(recipe, item);
                assert_eq!(count, 10);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn every_event_matches_its_fields() {
        let config = EmitterConfig::default();
        let mut random = RngSource::seeded(17);
        for i in 0..500_u64 {
            let event = synthesize_event(&config, &session(), i, &mut random).unwrap();
            let value = serde_json::to_value(&event).unwrap();
            let obj = value.as_object().unwrap();
            let has = |k: &str| obj.contains_key(k);
            match event.event.kind() {
                EventKind::EntityBuilt | EventKind::EntityMined => {
                    assert!(has("entity") && has("position") && has("surface"));
                    assert!(!has("tech_name") && !has("item") && !has("recipe"));
                }
                EventKind::ResearchStarted => {
                    assert!(has("tech_name") && has("tech_level") && !has("duration"));
                    assert!(!has("entity") && !has("item"));
                }
                EventKind::ResearchFinished => {
                    assert!(has("tech_name") && has("duration"));
                    assert!(!has("entity") && !has("item"));
                }
                EventKind::ItemCrafted => {
                    assert!(has("item") && has("count") && has("recipe"));
                    assert!(!has("entity") && !has("tech_name"));
                }
            }
            assert_eq!(obj["event_name"], event.event.name());
        }
    }

    #[test]
    fn research_duration_within_bounds() {
        let config = EmitterConfig::default();
        let mut random = RngSource::seeded(23);
        for _ in 0..300 {
            let event = synthesize_event(&config, &session(), 0, &mut random).unwrap();
            if let GameEvent::ResearchFinished {
                duration: Some(d), ..
            } = event.event
            {
                assert!((60.0..=600.0).contains(&d));
                assert!(is_rounded(d, 2));
            }
        }
    }

    #[test]
    fn empty_catalog_is_reported() {
        let mut config = EmitterConfig::default();
        config.catalog.entities.clear();
        // index 0 -> EntityBuilt
        let mut random = ScriptedSource::new(vec![0.0]);
        let result = synthesize_event(&config, &session(), 0, &mut random);
        assert!(matches!(
            result,
            Err(SynthError::EmptyCatalog { list: "entities" })
        ));
    }

    #[test]
    fn stats_quantities_are_rounded_and_non_negative() {
        let config = EmitterConfig::default();
        let mut random = RngSource::seeded(29);
        for cycle in 1..200_u64 {
            let stats = synthesize_stats(&config, &session(), cycle * 120, cycle, &mut random);
            for q in stats
                .products_production
                .values()
                .chain(stats.materials_consumption.values())
            {
                assert!(*q >= 0.0);
                assert!(is_rounded(*q, QUANTITY_DECIMALS));
            }
        }
    }

    #[test]
    fn fluids_only_appear_in_production() {
        let config = EmitterConfig::default();
        let mut random = RngSource::seeded(31);
        for _ in 0..100 {
            let stats = synthesize_stats(&config, &session(), 120, 1, &mut random);
            for fluid in &config.catalog.fluids {
                assert!(!stats.materials_consumption.contains_key(fluid));
            }
        }
    }

    #[test]
    fn certain_inclusion_fills_every_key() {
        let mut config = EmitterConfig::default();
        config.emission.item_probability = 1.0;
        config.emission.fluid_probability = 1.0;
        let mut random = RngSource::seeded(37);
        let stats = synthesize_stats(&config, &session(), 240, 2, &mut random);
        assert_eq!(stats.products_production.len(), 8);
        assert_eq!(stats.materials_consumption.len(), 5);
        assert_eq!(stats.cycle, 2);
        assert_eq!(stats.tick, 240);
    }

    #[test]
    fn zero_inclusion_leaves_maps_empty() {
        let mut config = EmitterConfig::default();
        config.emission.item_probability = 0.0;
        config.emission.fluid_probability = 0.0;
        let mut random = RngSource::seeded(41);
        let stats = synthesize_stats(&config, &session(), 120, 1, &mut random);
        assert!(stats.products_production.is_empty());
        assert!(stats.materials_consumption.is_empty());
    }

    #[test]
    fn optional_parts_follow_config() {
        let mut config = EmitterConfig::default();
        let mut random = RngSource::seeded(43);
        let stats = synthesize_stats(&config, &session(), 120, 1, &mut random);
        let player = stats.player.unwrap();
        assert!((0.0..=250.0).contains(&player.health));
        assert_eq!(player.surface, "nauvis");
        assert!(stats.screenshot_path.is_none());

        config.emission.player_snapshot = false;
        config.emission.screenshots = true;
        let stats = synthesize_stats(&config, &session(), 360, 3, &mut random);
        assert!(stats.player.is_none());
        assert_eq!(
            stats.screenshot_path.as_deref(),
            Some("screenshots/nauvis_1700000000_555555_360.png")
        );
    }
}
