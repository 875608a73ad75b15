//! Server-rendered pages. Forms post here and redirect back to the view.

use crate::errors::AppError;
use crate::handlers::save_ledger;
use crate::hours;
use crate::ledger::parse_amount;
use crate::models::{AppId, Direction, EntryKind, LargeParty};
use crate::offline::render_worker_script;
use crate::state::{AppState, Workspace};
use crate::stale;
use crate::tips::{self, PresetChange, TipInputs};
use crate::ui::{
    EndOfDayView, HoursView, HubView, MANIFEST_JSON, Notice, STYLE_CSS, TipView, render_end_of_day,
    render_hours_calc, render_hub, render_tip_calc,
};
use axum::{
    Form,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;
use tracing::{info, warn};

const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'.').remove(b'-').remove(b'_').remove(b':');

/// Blank is absent; anything unparsable is kept as NaN so validation flags it.
fn parse_field(raw: &Option<String>) -> Option<f64> {
    let raw = raw.as_deref().map(str::trim).filter(|raw| !raw.is_empty())?;
    Some(raw.parse::<f64>().unwrap_or(f64::NAN))
}

fn push_param(query: &mut Vec<String>, name: &str, value: Option<String>) {
    if let Some(value) = value {
        query.push(format!("{name}={}", utf8_percent_encode(&value, QUERY_VALUE)));
    }
}

/// The field as typed, so an invalid value survives the redirect and is flagged again.
fn raw_field(raw: &Option<String>) -> Option<String> {
    raw.as_deref()
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map(str::to_string)
}

fn with_query(path: &str, query: Vec<String>) -> String {
    if query.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{}", query.join("&"))
    }
}

async fn open_app(state: &AppState, workspace: &mut Workspace, app: AppId) -> Result<(), AppError> {
    if workspace.store.last_app() != Some(app) {
        workspace.store.set_last_app(app)?;
        state.persist(workspace).await?;
    }
    Ok(())
}

pub async fn hub(State(state): State<AppState>) -> Response {
    let workspace = state.workspace.lock().await;
    if let Some(app) = workspace.store.last_app() {
        return Redirect::to(&app.path()).into_response();
    }
    Html(render_hub(&hub_view(&workspace))).into_response()
}

/// The offline shell page: always the hub, never a redirect.
pub async fn shell(State(state): State<AppState>) -> Html<String> {
    let workspace = state.workspace.lock().await;
    Html(render_hub(&hub_view(&workspace)))
}

fn hub_view(workspace: &Workspace) -> HubView {
    let start = workspace
        .store
        .session()
        .and_then(|session| session.session_start_time);
    let stale_message = stale::check(start)
        .filter(|_| !workspace.stale_dismissed)
        .map(|notice| notice.bucket.to_string());
    HubView { stale_message }
}

pub async fn back_to_hub(State(state): State<AppState>) -> Result<Redirect, AppError> {
    let mut workspace = state.workspace.lock().await;
    if workspace.store.clear_last_app() {
        state.persist(&workspace).await?;
    }
    workspace.pending_preset = None;
    Ok(Redirect::to("/"))
}

pub async fn keep_stale(State(state): State<AppState>) -> Redirect {
    state.workspace.lock().await.stale_dismissed = true;
    Redirect::to("/")
}

pub async fn clear_stale(State(state): State<AppState>) -> Result<Redirect, AppError> {
    let mut workspace = state.workspace.lock().await;
    workspace.clear_session();
    state.persist(&workspace).await?;
    Ok(Redirect::to("/"))
}

#[derive(Debug, Default, Deserialize)]
pub struct TipForm {
    #[serde(default)]
    owed: Option<String>,
    #[serde(default)]
    sales: Option<String>,
    #[serde(default)]
    cash: Option<String>,
    #[serde(default)]
    notice: Option<Notice>,
}

impl TipForm {
    fn inputs(&self, parties: &[LargeParty]) -> TipInputs {
        TipInputs {
            owed: parse_field(&self.owed),
            sales: parse_field(&self.sales),
            cash: parse_field(&self.cash),
            parties: parties.to_vec(),
        }
    }

    fn query(&self, notice: Option<Notice>) -> Vec<String> {
        let mut query = Vec::new();
        for (name, raw) in [("owed", &self.owed), ("sales", &self.sales), ("cash", &self.cash)] {
            push_param(&mut query, name, raw_field(raw));
        }
        push_param(&mut query, "notice", notice.map(|notice| notice.as_str().to_string()));
        query
    }

    fn redirect(&self, notice: Option<Notice>) -> Redirect {
        Redirect::to(&with_query(&AppId::TipCalc.path(), self.query(notice)))
    }
}

pub async fn tip_calc(
    State(state): State<AppState>,
    Query(form): Query<TipForm>,
) -> Result<Html<String>, AppError> {
    let mut workspace = state.workspace.lock().await;
    open_app(&state, &mut workspace, AppId::TipCalc).await?;

    let preset = workspace.store.preset();
    let result = tips::calculate(&form.inputs(&workspace.parties), preset).map(|result| result.rounded());
    let view = TipView {
        owed: form.owed.clone().unwrap_or_default(),
        sales: form.sales.clone().unwrap_or_default(),
        cash: form.cash.clone().unwrap_or_default(),
        preset,
        parties: workspace.parties.clone(),
        result,
        pending_prompt: workspace.pending_preset.map(|change| change.prompt()),
        notice: form.notice,
    };
    Ok(Html(render_tip_calc(&view)))
}

#[derive(Debug, Deserialize)]
pub struct PartyForm {
    #[serde(flatten)]
    tip: TipForm,
    #[serde(default)]
    headcount: Option<String>,
    #[serde(default)]
    cost_per_head: Option<String>,
}

impl PartyForm {
    fn party(&self) -> LargeParty {
        let headcount = self.headcount.as_deref().and_then(parse_amount);
        let cost = self.cost_per_head.as_deref().and_then(parse_amount);
        LargeParty::with_values(headcount, cost)
    }
}

pub async fn add_party(State(state): State<AppState>, Form(form): Form<PartyForm>) -> Redirect {
    state.workspace.lock().await.parties.push(form.party());
    form.tip.redirect(None)
}

pub async fn edit_party(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Form(form): Form<PartyForm>,
) -> Redirect {
    let mut workspace = state.workspace.lock().await;
    match workspace.parties.get_mut(index) {
        Some(party) => *party = form.party(),
        None => warn!(index, "no large party to edit"),
    }
    form.tip.redirect(None)
}

pub async fn remove_party(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Form(form): Form<TipForm>,
) -> Redirect {
    let mut workspace = state.workspace.lock().await;
    if index < workspace.parties.len() {
        workspace.parties.remove(index);
    }
    form.redirect(None)
}

pub async fn send_tips(
    State(state): State<AppState>,
    Form(form): Form<TipForm>,
) -> Result<Redirect, AppError> {
    let mut workspace = state.workspace.lock().await;
    let inputs = form.inputs(&workspace.parties);
    let tips = tips::calculate(&inputs, workspace.store.preset()).map(|result| result.tips);

    let sent = match tips {
        Ok(value) => workspace.ledger.push_auto(EntryKind::Tips, value).is_ok(),
        Err(_) => false,
    };
    if !sent {
        return Ok(form.redirect(Some(Notice::CalculateFirst)));
    }
    save_ledger(&state, &mut workspace).await?;
    info!("tips sent to end of day");
    Ok(form.redirect(Some(Notice::Sent)))
}

#[derive(Debug, Deserialize)]
pub struct PresetForm {
    #[serde(flatten)]
    tip: TipForm,
    #[serde(default)]
    boh: Option<String>,
    #[serde(default)]
    foh: Option<String>,
}

pub async fn propose_preset(State(state): State<AppState>, Form(form): Form<PresetForm>) -> Redirect {
    let boh = parse_field(&form.boh).unwrap_or(f64::NAN);
    let foh = parse_field(&form.foh).unwrap_or(f64::NAN);
    match PresetChange::propose(boh, foh) {
        Ok(change) => {
            state.workspace.lock().await.pending_preset = Some(change);
            form.tip.redirect(None)
        }
        Err(err) => {
            warn!("preset edit rejected: {err}");
            form.tip.redirect(Some(Notice::InvalidPercent))
        }
    }
}

pub async fn propose_reset(State(state): State<AppState>, Form(form): Form<TipForm>) -> Redirect {
    state.workspace.lock().await.pending_preset = Some(PresetChange::Reset);
    form.redirect(None)
}

pub async fn confirm_preset(
    State(state): State<AppState>,
    Form(form): Form<TipForm>,
) -> Result<Redirect, AppError> {
    let mut workspace = state.workspace.lock().await;
    let Some(change) = workspace.pending_preset.take() else {
        return Ok(form.redirect(None));
    };
    let preset = change.preset();
    workspace.store.set_preset(preset)?;
    state.persist(&workspace).await?;
    info!(boh = preset.boh, foh = preset.foh, "tip preset saved");
    Ok(form.redirect(Some(Notice::Saved)))
}

pub async fn cancel_preset(State(state): State<AppState>, Form(form): Form<TipForm>) -> Redirect {
    state.workspace.lock().await.pending_preset = None;
    form.redirect(None)
}

pub async fn clear_tips(State(state): State<AppState>) -> Redirect {
    let mut workspace = state.workspace.lock().await;
    workspace.parties.clear();
    workspace.pending_preset = None;
    TipForm::default().redirect(None)
}

#[derive(Debug, Default, Deserialize)]
pub struct HoursForm {
    #[serde(default)]
    start: Option<String>,
    #[serde(default)]
    end: Option<String>,
    #[serde(default, rename = "break")]
    break_minutes: Option<String>,
    #[serde(default)]
    notice: Option<Notice>,
}

impl HoursForm {
    fn calculate(&self) -> Result<hours::ShiftHours, crate::errors::HoursError> {
        hours::calculate_from_fields(
            self.start.as_deref().unwrap_or(""),
            self.end.as_deref().unwrap_or(""),
            self.break_minutes.as_deref().unwrap_or(""),
        )
    }

    fn redirect(&self, notice: Option<Notice>) -> Redirect {
        let mut query = Vec::new();
        push_param(&mut query, "start", raw_field(&self.start));
        push_param(&mut query, "end", raw_field(&self.end));
        push_param(&mut query, "break", raw_field(&self.break_minutes));
        push_param(&mut query, "notice", notice.map(|notice| notice.as_str().to_string()));
        Redirect::to(&with_query(&AppId::HoursCalc.path(), query))
    }
}

pub async fn hours_calc(
    State(state): State<AppState>,
    Query(form): Query<HoursForm>,
) -> Result<Html<String>, AppError> {
    let mut workspace = state.workspace.lock().await;
    open_app(&state, &mut workspace, AppId::HoursCalc).await?;

    let view = HoursView {
        start: form.start.clone().unwrap_or_default(),
        end: form.end.clone().unwrap_or_default(),
        break_minutes: form.break_minutes.clone().unwrap_or_default(),
        result: form.calculate(),
        notice: form.notice,
    };
    Ok(Html(render_hours_calc(&view)))
}

pub async fn send_hours(
    State(state): State<AppState>,
    Form(form): Form<HoursForm>,
) -> Result<Redirect, AppError> {
    let rounded = form.calculate().map(|result| result.rounded_hours).unwrap_or(0.0);
    let mut workspace = state.workspace.lock().await;
    if workspace.ledger.push_auto(EntryKind::Hours, rounded).is_err() {
        return Ok(form.redirect(Some(Notice::CalculateFirst)));
    }
    save_ledger(&state, &mut workspace).await?;
    info!(hours = rounded, "hours sent to end of day");
    Ok(form.redirect(Some(Notice::Sent)))
}

#[derive(Debug, Default, Deserialize)]
pub struct EndOfDayQuery {
    #[serde(default)]
    breakdown: bool,
}

fn end_of_day_failure(workspace: &Workspace, status: StatusCode, message: String) -> Response {
    let view = EndOfDayView::from_ledger(&workspace.ledger, false, Some(message));
    (status, Html(render_end_of_day(&view))).into_response()
}

fn end_of_day_redirect() -> Response {
    Redirect::to(&AppId::EndOfDay.path()).into_response()
}

pub async fn end_of_day(
    State(state): State<AppState>,
    Query(query): Query<EndOfDayQuery>,
) -> Result<Html<String>, AppError> {
    let mut workspace = state.workspace.lock().await;
    open_app(&state, &mut workspace, AppId::EndOfDay).await?;
    let view = EndOfDayView::from_ledger(&workspace.ledger, query.breakdown, None);
    Ok(Html(render_end_of_day(&view)))
}

#[derive(Debug, Deserialize)]
pub struct EntryForm {
    kind: EntryKind,
    #[serde(default)]
    value: String,
}

pub async fn add_entry(
    State(state): State<AppState>,
    Form(form): Form<EntryForm>,
) -> Result<Response, AppError> {
    let mut workspace = state.workspace.lock().await;
    let value = parse_amount(&form.value).unwrap_or(f64::NAN);
    if let Err(err) = workspace.ledger.add(form.kind, value) {
        return Ok(end_of_day_failure(&workspace, StatusCode::BAD_REQUEST, err.to_string()));
    }
    save_ledger(&state, &mut workspace).await?;
    Ok(end_of_day_redirect())
}

#[derive(Debug, Deserialize)]
pub struct ValueForm {
    #[serde(default)]
    value: String,
}

pub async fn edit_entry(
    State(state): State<AppState>,
    Path((kind, index)): Path<(EntryKind, usize)>,
    Form(form): Form<ValueForm>,
) -> Result<Response, AppError> {
    let mut workspace = state.workspace.lock().await;
    let value = parse_amount(&form.value).unwrap_or(f64::NAN);
    if let Err(err) = workspace.ledger.edit(kind, index, value) {
        let status = AppError::from(err.clone()).status;
        return Ok(end_of_day_failure(&workspace, status, err.to_string()));
    }
    save_ledger(&state, &mut workspace).await?;
    Ok(end_of_day_redirect())
}

pub async fn delete_entry(
    State(state): State<AppState>,
    Path((kind, index)): Path<(EntryKind, usize)>,
) -> Result<Response, AppError> {
    let mut workspace = state.workspace.lock().await;
    if let Err(err) = workspace.ledger.delete(kind, index) {
        return Ok(end_of_day_failure(&workspace, StatusCode::NOT_FOUND, err.to_string()));
    }
    save_ledger(&state, &mut workspace).await?;
    Ok(end_of_day_redirect())
}

pub async fn undo(State(state): State<AppState>) -> Result<Response, AppError> {
    let mut workspace = state.workspace.lock().await;
    if workspace.ledger.undo().is_some() {
        save_ledger(&state, &mut workspace).await?;
    }
    Ok(end_of_day_redirect())
}

#[derive(Debug, Deserialize)]
pub struct ReorderForm {
    index: usize,
    direction: Direction,
}

pub async fn reorder(
    State(state): State<AppState>,
    Form(form): Form<ReorderForm>,
) -> Result<Response, AppError> {
    let mut workspace = state.workspace.lock().await;
    if workspace.ledger.reorder(form.index, form.direction) {
        save_ledger(&state, &mut workspace).await?;
    }
    Ok(end_of_day_redirect())
}

#[derive(Debug, Deserialize)]
pub struct ResetForm {
    #[serde(default)]
    confirm: Option<String>,
}

pub async fn reset_end_of_day(
    State(state): State<AppState>,
    Form(form): Form<ResetForm>,
) -> Result<Response, AppError> {
    let mut workspace = state.workspace.lock().await;
    if form.confirm.as_deref() != Some("true") {
        warn!("end of day reset requested without confirmation");
        return Ok(end_of_day_failure(
            &workspace,
            StatusCode::BAD_REQUEST,
            "Tick the box to confirm clearing all data".to_string(),
        ));
    }
    workspace.clear_session();
    state.persist(&workspace).await?;
    Ok(end_of_day_redirect())
}

pub async fn service_worker() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript")],
        render_worker_script(),
    )
}

pub async fn manifest() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/manifest+json")], MANIFEST_JSON)
}

pub async fn stylesheet() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css")], STYLE_CSS)
}
