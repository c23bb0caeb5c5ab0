use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::Utc;
use fantoccini::ClientBuilder;
use serde::Deserialize;
use serde_json::json;

use crate::models::{MatchStatus, StagedMatch};

use super::{Adapter, AdapterContext, BoxFuture, DiscoveredEvent, RateLimitPolicy};

const ADAPTER_ID: &str = "ks-youth-soccer";
const WEBDRIVER_URL: &str = "http://localhost:4444";
const SCHEDULE_BASE_URL: &str = "https://ksyouthsoccer.example/schedule";

/// Browser-transport reference adapter for JS-rendered standings pages.
/// Deliberately uses fantoccini's narrow `open`/`execute`/`close` surface
/// rather than driving the page interactively -- the page embeds its data
/// as a JSON blob in a script tag, so that's all this needs.
pub fn adapter() -> Adapter {
    Adapter {
        id: ADAPTER_ID,
        source_platform: ADAPTER_ID,
        rate_limit: RateLimitPolicy::new(1, Duration::from_secs(2)),
        discover_events: discover_events_boxed,
        scrape_event: scrape_event_boxed,
        standings: None,
    }
}

fn discover_events_boxed(ctx: AdapterContext) -> BoxFuture<Result<Vec<DiscoveredEvent>>> {
    Box::pin(discover_events(ctx))
}

fn scrape_event_boxed(ctx: AdapterContext, event: DiscoveredEvent) -> BoxFuture<Result<Vec<StagedMatch>>> {
    Box::pin(scrape_event(ctx, event))
}

#[derive(Debug, Deserialize)]
struct EmbeddedEvent {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddedGame {
    id: String,
    date: String,
    home_team: String,
    away_team: String,
    home_score: Option<i32>,
    away_score: Option<i32>,
}

async fn extract_json_blob(url: &str) -> Result<serde_json::Value> {
    let client = ClientBuilder::native()
        .connect(WEBDRIVER_URL)
        .await
        .map_err(|e| anyhow!("failed to connect to webdriver: {e}"))?;

    client.goto(url).await.map_err(|e| anyhow!("navigation to {url} failed: {e}"))?;

    let raw: serde_json::Value = client
        .execute(
            "return JSON.parse(document.getElementById('schedule-data').textContent);",
            vec![],
        )
        .await
        .map_err(|e| anyhow!("page script extraction failed: {e}"))?;

    client.close().await.ok();
    Ok(raw)
}

async fn discover_events(_ctx: AdapterContext) -> Result<Vec<DiscoveredEvent>> {
    let blob = extract_json_blob(SCHEDULE_BASE_URL).await?;
    let events: Vec<EmbeddedEvent> = serde_json::from_value(
        blob.get("events").cloned().ok_or_else(|| anyhow!("missing 'events' key in embedded blob"))?,
    )?;

    Ok(events
        .into_iter()
        .map(|e| DiscoveredEvent { source_event_id: e.id, name: e.name, event_type_hint: None })
        .collect())
}

async fn scrape_event(_ctx: AdapterContext, event: DiscoveredEvent) -> Result<Vec<StagedMatch>> {
    let url = format!("{SCHEDULE_BASE_URL}/{}", event.source_event_id);
    let blob = extract_json_blob(&url).await?;
    let games: Vec<EmbeddedGame> = serde_json::from_value(
        blob.get("games").cloned().ok_or_else(|| anyhow!("missing 'games' key in embedded blob"))?,
    )?;

    let mut staged = Vec::with_capacity(games.len());
    for game in games {
        let match_date = chrono::NaiveDate::parse_from_str(&game.date, "%Y-%m-%d")
            .map_err(|e| anyhow!("unparseable game date {:?}: {e}", game.date))?;

        staged.push(StagedMatch {
            source_match_key: format!("{ADAPTER_ID}-{}-{}", event.source_event_id, game.id),
            match_date,
            match_time: None,
            home_team_name: game.home_team,
            away_team_name: game.away_team,
            home_score: game.home_score,
            away_score: game.away_score,
            status: MatchStatus::from_scores(game.home_score, game.away_score),
            location: None,
            division: None,
            gender: None,
            age_group: None,
            event_name: Some(event.name.clone()),
            event_id: Some(event.source_event_id.clone()),
            source_platform: ADAPTER_ID.to_string(),
            raw_data: json!({ "id": game.id }),
            processed: false,
            processed_at: None,
            error_message: None,
            scraped_at: Utc::now(),
        });
    }

    Ok(staged)
}
