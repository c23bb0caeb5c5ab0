use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::Utc;
use reqwest::Response;
use serde::Deserialize;
use serde_json::json;

use crate::error::classify_http_status;
use crate::models::{MatchStatus, StagedMatch};

use super::{Adapter, AdapterContext, BoxFuture, DiscoveredEvent, RateLimitPolicy};

fn retry_after_secs(response: &Response) -> Option<u64> {
    response.headers().get("retry-after")?.to_str().ok()?.parse().ok()
}

/// Turns a non-2xx response into the classified `PipelineError` the engine's
/// retry loop inspects, falling back to a plain message for statuses that
/// carry no special propagation policy (e.g. 404).
fn http_error(response: Response, context: &str) -> anyhow::Error {
    let status = response.status().as_u16();
    match classify_http_status(status, retry_after_secs(&response)) {
        Some(kind) => anyhow::Error::new(kind).context(context.to_string()),
        None => anyhow!("{context}: HTTP {status}"),
    }
}

const ADAPTER_ID: &str = "heartland";
const BASE_URL: &str = "https://api.heartlandsoccer.example/v1";

/// JSON-over-HTTP reference adapter, grounded on the teacher's
/// `FootballDataCompetitions`/`FootballMatch` request shapes: a paged
/// `/events` listing and an `/events/{id}/games` schedule endpoint.
pub fn adapter() -> Adapter {
    Adapter {
        id: ADAPTER_ID,
        source_platform: ADAPTER_ID,
        rate_limit: RateLimitPolicy::new(5, Duration::from_secs(1)),
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
struct EventsResponse {
    events: Vec<RemoteEvent>,
}

#[derive(Debug, Deserialize)]
struct RemoteEvent {
    id: String,
    name: String,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GamesResponse {
    games: Vec<RemoteGame>,
}

#[derive(Debug, Deserialize)]
struct RemoteGame {
    id: String,
    date: String,
    time: Option<String>,
    home_team: String,
    away_team: String,
    home_score: Option<i32>,
    away_score: Option<i32>,
}

async fn discover_events(ctx: AdapterContext) -> Result<Vec<DiscoveredEvent>> {
    let mut request = ctx.http.get(format!("{BASE_URL}/events"));
    if let Some(token) = &ctx.credential {
        request = request.header("X-Api-Key", token.as_str());
    }

    let response = request.send().await?;
    if !response.status().is_success() {
        return Err(http_error(response, "heartland /events request failed"));
    }

    let body: EventsResponse = response.json().await?;
    Ok(body
        .events
        .into_iter()
        .map(|e| DiscoveredEvent { source_event_id: e.id, name: e.name, event_type_hint: e.kind })
        .collect())
}

async fn scrape_event(ctx: AdapterContext, event: DiscoveredEvent) -> Result<Vec<StagedMatch>> {
    let mut request = ctx.http.get(format!("{BASE_URL}/events/{}/games", event.source_event_id));
    if let Some(token) = &ctx.credential {
        request = request.header("X-Api-Key", token.as_str());
    }

    let response = request.send().await?;
    if !response.status().is_success() {
        return Err(http_error(
            response,
            &format!("heartland /events/{}/games request failed", event.source_event_id),
        ));
    }

    let body: GamesResponse = response.json().await?;
    let mut staged = Vec::with_capacity(body.games.len());

    for game in body.games {
        let match_date = chrono::NaiveDate::parse_from_str(&game.date, "%Y-%m-%d")
            .map_err(|e| anyhow!("unparseable game date {:?}: {e}", game.date))?;
        let match_time = game
            .time
            .as_deref()
            .and_then(|t| chrono::NaiveTime::parse_from_str(t, "%H:%M").ok());

        staged.push(StagedMatch {
            source_match_key: format!("{ADAPTER_ID}-{}-{}", event.source_event_id, game.id),
            match_date,
            match_time,
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
