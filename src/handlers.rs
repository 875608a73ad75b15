use crate::errors::AppError;
use crate::hours::{self, ShiftHours};
use crate::models::{
    AddEntryRequest, BreakdownLine, BreakdownResponse, ConfirmQuery, EditEntryRequest, EntryKind,
    HoursRequest, LastAppResponse, PresetRequest, ReorderRequest, SessionResponse, StaleResponse,
    TipPreset, TipRequest,
};
use crate::state::{AppState, Workspace};
use crate::stale;
use crate::tips::{self, PresetChange, TipBreakdown, TipInputs};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::info;

/// Writes the ledger into the store and the store to disk.
pub(crate) async fn save_ledger(state: &AppState, workspace: &mut Workspace) -> Result<(), AppError> {
    workspace.sync_session()?;
    state.persist(workspace).await?;
    Ok(())
}

pub(crate) fn session_response(workspace: &Workspace) -> SessionResponse {
    let ledger = &workspace.ledger;
    SessionResponse {
        session_start_time: workspace
            .store
            .session()
            .and_then(|session| session.session_start_time),
        total_hours: ledger.total_hours(),
        total_tips: ledger.total_tips(),
        hourly_rate: ledger.hourly_rate(),
        entry_count: ledger.row_count(),
        hours_entries: ledger.entries(EntryKind::Hours).to_vec(),
        tips_entries: ledger.entries(EntryKind::Tips).to_vec(),
        can_undo: ledger.can_undo(),
    }
}

pub async fn get_session(State(state): State<AppState>) -> Json<SessionResponse> {
    let workspace = state.workspace.lock().await;
    Json(session_response(&workspace))
}

pub async fn clear_session(State(state): State<AppState>) -> Result<Json<SessionResponse>, AppError> {
    let mut workspace = state.workspace.lock().await;
    workspace.clear_session();
    state.persist(&workspace).await?;
    Ok(Json(session_response(&workspace)))
}

pub async fn add_entry(
    State(state): State<AppState>,
    Json(payload): Json<AddEntryRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let mut workspace = state.workspace.lock().await;
    workspace.ledger.add(payload.kind, payload.value)?;
    save_ledger(&state, &mut workspace).await?;
    Ok(Json(session_response(&workspace)))
}

pub async fn edit_entry(
    State(state): State<AppState>,
    Path((kind, index)): Path<(EntryKind, usize)>,
    Json(payload): Json<EditEntryRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let mut workspace = state.workspace.lock().await;
    workspace.ledger.edit(kind, index, payload.value)?;
    save_ledger(&state, &mut workspace).await?;
    Ok(Json(session_response(&workspace)))
}

pub async fn delete_entry(
    State(state): State<AppState>,
    Path((kind, index)): Path<(EntryKind, usize)>,
) -> Result<Json<SessionResponse>, AppError> {
    let mut workspace = state.workspace.lock().await;
    workspace.ledger.delete(kind, index)?;
    save_ledger(&state, &mut workspace).await?;
    Ok(Json(session_response(&workspace)))
}

pub async fn undo(State(state): State<AppState>) -> Result<Json<SessionResponse>, AppError> {
    let mut workspace = state.workspace.lock().await;
    if workspace.ledger.undo().is_some() {
        save_ledger(&state, &mut workspace).await?;
    }
    Ok(Json(session_response(&workspace)))
}

pub async fn reorder(
    State(state): State<AppState>,
    Json(payload): Json<ReorderRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let mut workspace = state.workspace.lock().await;
    if workspace.ledger.reorder(payload.index, payload.direction) {
        save_ledger(&state, &mut workspace).await?;
    }
    Ok(Json(session_response(&workspace)))
}

pub async fn get_breakdown(State(state): State<AppState>) -> Result<Json<BreakdownResponse>, AppError> {
    let workspace = state.workspace.lock().await;
    let breakdown = workspace
        .ledger
        .breakdown()
        .ok_or_else(|| AppError::not_found("add hours to see a breakdown"))?;

    Ok(Json(BreakdownResponse {
        hourly_rate: breakdown.hourly_rate,
        lines: breakdown
            .items
            .iter()
            .map(|item| BreakdownLine {
                hours: item.entry.value,
                auto: item.entry.auto,
                tips: item.tips,
            })
            .collect(),
        total: breakdown.total,
    }))
}

pub async fn get_stale(State(state): State<AppState>) -> Json<StaleResponse> {
    let workspace = state.workspace.lock().await;
    let start = workspace
        .store
        .session()
        .and_then(|session| session.session_start_time);

    Json(match stale::check(start) {
        Some(notice) => StaleResponse {
            stale: true,
            age_hours: Some(notice.age.num_hours()),
            message: Some(notice.bucket.to_string()),
        },
        None => StaleResponse {
            stale: false,
            age_hours: None,
            message: None,
        },
    })
}

fn tip_inputs(payload: TipRequest) -> TipInputs {
    TipInputs {
        owed: payload.owed,
        sales: payload.sales,
        cash: payload.cash,
        parties: payload.parties,
    }
}

pub async fn calculate_tips(
    State(state): State<AppState>,
    Json(payload): Json<TipRequest>,
) -> Result<Json<TipBreakdown>, AppError> {
    let preset = state.workspace.lock().await.store.preset();
    let result = tips::calculate(&tip_inputs(payload), preset)?;
    Ok(Json(result.rounded()))
}

pub async fn send_tips(
    State(state): State<AppState>,
    Json(payload): Json<TipRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let mut workspace = state.workspace.lock().await;
    let result = tips::calculate(&tip_inputs(payload), workspace.store.preset())?;
    workspace.ledger.push_auto(EntryKind::Tips, result.tips)?;
    save_ledger(&state, &mut workspace).await?;
    info!(tips = result.tips, "tips sent to end of day");
    Ok(Json(session_response(&workspace)))
}

pub async fn get_preset(State(state): State<AppState>) -> Json<TipPreset> {
    Json(state.workspace.lock().await.store.preset())
}

async fn apply_preset_change(
    state: &AppState,
    change: PresetChange,
    confirmed: bool,
) -> Result<Json<TipPreset>, AppError> {
    if !confirmed {
        return Err(AppError::conflict(change.prompt()));
    }
    let mut workspace = state.workspace.lock().await;
    let preset = change.preset();
    workspace.store.set_preset(preset)?;
    workspace.pending_preset = None;
    state.persist(&workspace).await?;
    info!(boh = preset.boh, foh = preset.foh, "tip preset saved");
    Ok(Json(preset))
}

pub async fn put_preset(
    State(state): State<AppState>,
    Json(payload): Json<PresetRequest>,
) -> Result<Json<TipPreset>, AppError> {
    let change = PresetChange::propose(payload.boh, payload.foh)?;
    apply_preset_change(&state, change, payload.confirm).await
}

pub async fn reset_preset(
    State(state): State<AppState>,
    Query(query): Query<ConfirmQuery>,
) -> Result<Json<TipPreset>, AppError> {
    apply_preset_change(&state, PresetChange::Reset, query.confirm).await
}

fn shift_hours(payload: &HoursRequest) -> Result<ShiftHours, AppError> {
    let start = hours::parse_clock("start", payload.start.as_deref().unwrap_or(""))?;
    let end = hours::parse_clock("end", payload.end.as_deref().unwrap_or(""))?;
    Ok(hours::calculate(start, end, payload.break_minutes.unwrap_or(0)))
}

pub async fn calculate_hours(Json(payload): Json<HoursRequest>) -> Result<Json<ShiftHours>, AppError> {
    Ok(Json(shift_hours(&payload)?))
}

pub async fn send_hours(
    State(state): State<AppState>,
    Json(payload): Json<HoursRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let result = shift_hours(&payload)?;
    let mut workspace = state.workspace.lock().await;
    workspace.ledger.push_auto(EntryKind::Hours, result.rounded_hours)?;
    save_ledger(&state, &mut workspace).await?;
    info!(hours = result.rounded_hours, "hours sent to end of day");
    Ok(Json(session_response(&workspace)))
}

pub async fn get_last_app(State(state): State<AppState>) -> Json<LastAppResponse> {
    let workspace = state.workspace.lock().await;
    Json(LastAppResponse {
        app: workspace.store.last_app().map(|app| app.as_str().to_string()),
    })
}
