//! Anchor/history/grid navigation state machine.
//!
//! # Responsibility
//! - Own the anchor, history stack and relationship grid overlay.
//! - Translate gesture intents into algebra queries, card resolution and
//!   anchor changes.
//!
//! # Invariants
//! - Exactly one anchor is live; only `set_anchor` replaces it.
//! - An open grid always closes before the anchor changes.
//! - History receives the previous anchor, never the new one.
//! - Async results carry the generation they were issued under and are
//!   dropped when that generation is no longer current.
//! - A missing relative yields an empty or sparse grid, never an error.
//!
//! # See also
//! - `crate::model::relation` for candidate generation.

use crate::config::{ConfigError, EngineConfig};
use crate::model::card::Card;
use crate::model::identifier::{IdError, Identifier};
use crate::model::meta::PersonMeta;
use crate::model::relation::{child_ids, parent_id, sibling_ids, spouse_toggle};
use crate::probe::ExistenceProbe;
use crate::repo::meta_repo::{MetaRepoError, MetadataStore};
use crate::service::card_resolver::CardResolver;
use crate::service::gesture::{GestureEvent, SwipeDirection};
use crate::service::location::{fragment_for, LocationReflector};
use crate::service::meta_service::{MetaService, SyncStatus};
use crate::sync::label_client::LabelSync;
use async_trait::async_trait;
use futures_util::future::join;
use log::{debug, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type NavResult<T> = Result<T, NavigationError>;

/// Errors from engine construction and metadata persistence.
#[derive(Debug)]
pub enum NavigationError {
    Config(ConfigError),
    Id(IdError),
    Meta(MetaRepoError),
}

impl Display for NavigationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Id(err) => write!(f, "{err}"),
            Self::Meta(err) => write!(f, "{err}"),
        }
    }
}

impl Error for NavigationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Id(err) => Some(err),
            Self::Meta(err) => Some(err),
        }
    }
}

impl From<ConfigError> for NavigationError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<IdError> for NavigationError {
    fn from(value: IdError) -> Self {
        Self::Id(value)
    }
}

impl From<MetaRepoError> for NavigationError {
    fn from(value: MetaRepoError) -> Self {
        Self::Meta(value)
    }
}

/// Relationship shown by a grid overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridKind {
    Children,
    Siblings,
    Parents,
    /// Spouses navigate directly; requesting this grid is a no-op.
    Spouse,
}

/// Top-level engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    Viewing,
    GridOpen(GridKind),
}

/// Visible relationship grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridState {
    pub kind: GridKind,
    pub cards: Vec<Card>,
}

/// Artifact load state of the anchor photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactStatus {
    Pending,
    Found,
    /// Probe failed; the placeholder artifact is displayed.
    Missing,
}

/// What the display shows for the current anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorView {
    pub id: Identifier,
    pub artifact_ref: String,
    pub display_name: String,
    pub status: ArtifactStatus,
}

/// Anchor and grid generation counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Generation {
    pub anchor: u64,
    pub grid: u64,
}

/// Pending artifact load for one anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorTicket {
    generation: u64,
    id: Identifier,
}

impl AnchorTicket {
    pub fn id(&self) -> &Identifier {
        &self.id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Settled anchor probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorLoad {
    pub ticket: AnchorTicket,
    pub exists: bool,
}

/// Candidates for one grid open, tagged with the issuing generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridRequest {
    generation: Generation,
    kind: GridKind,
    candidates: Vec<Identifier>,
    second_parent: Option<Identifier>,
}

impl GridRequest {
    pub fn kind(&self) -> GridKind {
        self.kind
    }

    pub fn candidates(&self) -> &[Identifier] {
        &self.candidates
    }

    pub fn second_parent(&self) -> Option<&Identifier> {
        self.second_parent.as_ref()
    }
}

/// Resolved grid, not yet applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridResult {
    pub generation: Generation,
    pub kind: GridKind,
    pub cards: Vec<Card>,
}

/// Spouse toggle target awaiting its existence probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpouseRequest {
    generation: Generation,
    target: Identifier,
}

impl SpouseRequest {
    pub fn target(&self) -> &Identifier {
        &self.target
    }
}

/// Settled spouse probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpouseProbe {
    pub request: SpouseRequest,
    pub exists: bool,
}

/// Result of a back command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackResult {
    GridClosed,
    Navigated(AnchorTicket),
    /// Viewing with empty history.
    Ignored,
}

/// User intent delivered by the gesture layer or a tile tap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Swipe(SwipeDirection),
    /// Tap on the grid tile at this index.
    TapTile(usize),
    Back,
    LongPress,
}

impl From<SwipeDirection> for Intent {
    fn from(value: SwipeDirection) -> Self {
        Self::Swipe(value)
    }
}

impl From<GestureEvent> for Intent {
    fn from(value: GestureEvent) -> Self {
        match value {
            GestureEvent::Swipe(direction) => Self::Swipe(direction),
            GestureEvent::LongPress => Self::LongPress,
        }
    }
}

/// Outcome of the soft-edit command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditResult {
    Cancelled,
    Saved(PersonMeta),
}

/// External UI collaborator that collects `{name, dob}` for one person.
#[async_trait]
pub trait SoftEditor: Send + Sync {
    async fn request_edit(&self, id: &Identifier, current: &PersonMeta) -> EditResult;
}

/// Observable effect of one dispatched intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Ignored,
    GridOpened { kind: GridKind, cards: usize },
    GridClosed,
    Navigated(Identifier),
    MetadataSaved(SyncStatus),
    EditCancelled,
}

/// Navigation engine owning all session state.
pub struct NavigationEngine<P: ExistenceProbe, S: MetadataStore> {
    config: EngineConfig,
    resolver: CardResolver<P>,
    meta: MetaService<S>,
    editor: Option<Box<dyn SoftEditor>>,
    reflector: Option<Box<dyn LocationReflector>>,
    anchor: AnchorView,
    history: Vec<Identifier>,
    grid: Option<GridState>,
    location: String,
    generation: Generation,
}

impl<P: ExistenceProbe, S: MetadataStore> NavigationEngine<P, S> {
    /// Creates an engine viewing `start`.
    ///
    /// # Errors
    /// - `Config` when `config` fails validation.
    /// - `Id` when `start` is malformed or has the wrong digit width.
    pub fn new(config: EngineConfig, probe: P, store: S, start: &str) -> NavResult<Self> {
        config.validate()?;
        let start = Identifier::with_width(start, config.digit_width)?;
        let resolver = CardResolver::new(probe, &config);
        let meta = MetaService::new(store);
        let anchor = AnchorView {
            artifact_ref: resolver.artifact_ref(&start),
            display_name: meta.label(&start),
            status: ArtifactStatus::Pending,
            id: start,
        };
        let location = fragment_for(&anchor.id);
        info!(
            "event=engine_start module=navigation status=ok anchor={} digit_width={}",
            anchor.id, config.digit_width
        );

        Ok(Self {
            config,
            resolver,
            meta,
            editor: None,
            reflector: None,
            anchor,
            history: Vec::new(),
            grid: None,
            location,
            generation: Generation::default(),
        })
    }

    pub fn with_soft_editor(mut self, editor: Box<dyn SoftEditor>) -> Self {
        self.editor = Some(editor);
        self
    }

    pub fn with_remote_sync(mut self, remote: Box<dyn LabelSync>) -> Self {
        self.meta.set_remote(remote);
        self
    }

    /// Attaches a location sink and reflects the current anchor immediately.
    pub fn with_location_reflector(mut self, mut reflector: Box<dyn LocationReflector>) -> Self {
        reflector.replace_fragment(&self.location);
        self.reflector = Some(reflector);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> NavState {
        match &self.grid {
            Some(grid) => NavState::GridOpen(grid.kind),
            None => NavState::Viewing,
        }
    }

    pub fn anchor(&self) -> &Identifier {
        &self.anchor.id
    }

    pub fn anchor_view(&self) -> &AnchorView {
        &self.anchor
    }

    pub fn grid(&self) -> Option<&GridState> {
        self.grid.as_ref()
    }

    pub fn history(&self) -> &[Identifier] {
        &self.history
    }

    /// Fragment last written for the current anchor, e.g. `id=140000`.
    pub fn location_fragment(&self) -> &str {
        &self.location
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn metadata(&self) -> &MetaService<S> {
        &self.meta
    }

    /// Ticket for (re)loading the current anchor artifact.
    pub fn current_ticket(&self) -> AnchorTicket {
        AnchorTicket {
            generation: self.generation.anchor,
            id: self.anchor.id.clone(),
        }
    }

    /// Replaces the anchor.
    ///
    /// Closes any open grid first, pushes the previous anchor when
    /// `push_history` is set, reflects the location and resets the anchor
    /// view to a pending artifact load.
    pub fn set_anchor(&mut self, id: Identifier, push_history: bool) -> AnchorTicket {
        self.close_grid();
        // Pending grid requests were computed for the old anchor.
        self.generation.grid += 1;
        self.generation.anchor += 1;

        let previous = std::mem::replace(
            &mut self.anchor,
            AnchorView {
                artifact_ref: self.resolver.artifact_ref(&id),
                display_name: self.meta.label(&id),
                status: ArtifactStatus::Pending,
                id,
            },
        );
        if push_history {
            self.history.push(previous.id.clone());
        }

        self.location = fragment_for(&self.anchor.id);
        if let Some(reflector) = self.reflector.as_mut() {
            reflector.replace_fragment(&self.location);
        }

        info!(
            "event=anchor_set module=navigation status=ok from={} to={} push_history={} history_len={}",
            previous.id,
            self.anchor.id,
            push_history,
            self.history.len()
        );
        self.current_ticket()
    }

    /// Parses an externally supplied id and navigates to it with history.
    pub fn jump_to(&mut self, raw: &str) -> NavResult<AnchorTicket> {
        let id = Identifier::with_width(raw, self.config.digit_width)?;
        Ok(self.set_anchor(id, true))
    }

    /// Probes the artifact for `ticket`.
    pub async fn load_anchor(&self, ticket: AnchorTicket) -> AnchorLoad {
        let exists = self.resolver.exists(&ticket.id).await;
        AnchorLoad { ticket, exists }
    }

    /// Applies an anchor load; returns `false` when it is stale.
    pub fn apply_anchor(&mut self, load: AnchorLoad) -> bool {
        if load.ticket.generation != self.generation.anchor {
            debug!(
                "event=anchor_load module=navigation status=stale id={} generation={} current={}",
                load.ticket.id, load.ticket.generation, self.generation.anchor
            );
            return false;
        }

        let id = &self.anchor.id;
        if load.exists {
            self.anchor.artifact_ref = self.resolver.artifact_ref(id);
            self.anchor.status = ArtifactStatus::Found;
        } else {
            self.anchor.artifact_ref = self.config.placeholder_artifact.clone();
            self.anchor.status = ArtifactStatus::Missing;
        }
        self.anchor.display_name = self.meta.label(id);
        true
    }

    /// Loads and applies the current anchor artifact.
    pub async fn refresh_anchor(&mut self) -> bool {
        let load = self.load_anchor(self.current_ticket()).await;
        self.apply_anchor(load)
    }

    /// Computes grid candidates; `None` when a grid is already open or the
    /// kind never opens a grid.
    pub fn request_grid(&mut self, kind: GridKind) -> NavResult<Option<GridRequest>> {
        if self.grid.is_some() {
            return Ok(None);
        }

        let anchor = &self.anchor.id;
        let slots = self.config.max_candidates;
        let (candidates, second_parent) = match kind {
            GridKind::Children => (child_ids(anchor, slots)?, None),
            GridKind::Siblings => (sibling_ids(anchor, slots)?, None),
            GridKind::Parents => match parent_id(anchor)? {
                Some(parent) => {
                    let second = parent.spouse();
                    (vec![parent], Some(second))
                }
                None => (Vec::new(), None),
            },
            GridKind::Spouse => return Ok(None),
        };

        self.generation.grid += 1;
        Ok(Some(GridRequest {
            generation: self.generation,
            kind,
            candidates,
            second_parent,
        }))
    }

    /// Resolves a grid request into cards.
    ///
    /// The second-parent candidate is probed alongside the primary
    /// candidates and falls back to a placeholder tile when absent.
    pub async fn resolve_grid(&self, request: GridRequest) -> GridResult {
        let store = self.meta.store();
        let second_parent = async {
            match &request.second_parent {
                Some(id) => Some(self.resolver.exists(id).await),
                None => None,
            }
        };
        let (mut cards, second_exists) = join(
            self.resolver.resolve(&request.candidates, store),
            second_parent,
        )
        .await;

        if let (Some(id), Some(exists)) = (&request.second_parent, second_exists) {
            let label = store.display_name(id);
            let card = if exists {
                Card::new(id.clone(), self.resolver.artifact_ref(id), label)
            } else {
                Card::placeholder(id.clone(), &self.config.placeholder_artifact, label)
            };
            cards.push(card);
        }

        GridResult {
            generation: request.generation,
            kind: request.kind,
            cards,
        }
    }

    /// Opens the grid; returns `false` when the result is stale.
    pub fn apply_grid(&mut self, result: GridResult) -> bool {
        if result.generation != self.generation || self.grid.is_some() {
            debug!(
                "event=grid_open module=navigation status=stale kind={:?} anchor={}",
                result.kind, self.anchor.id
            );
            return false;
        }
        info!(
            "event=grid_open module=navigation status=ok kind={:?} anchor={} cards={}",
            result.kind,
            self.anchor.id,
            result.cards.len()
        );
        self.grid = Some(GridState {
            kind: result.kind,
            cards: result.cards,
        });
        true
    }

    /// Closes the grid without touching history; returns whether one was open.
    pub fn close_grid(&mut self) -> bool {
        if self.grid.take().is_none() {
            return false;
        }
        self.generation.grid += 1;
        true
    }

    /// Spouse toggle target for the current anchor; `None` while a grid is open.
    pub fn request_spouse(&self) -> Option<SpouseRequest> {
        if self.grid.is_some() {
            return None;
        }
        Some(SpouseRequest {
            generation: self.generation,
            target: spouse_toggle(&self.anchor.id),
        })
    }

    pub async fn probe_spouse(&self, request: SpouseRequest) -> SpouseProbe {
        let exists = self.resolver.exists(&request.target).await;
        SpouseProbe { request, exists }
    }

    /// Navigates to the spouse target when it exists and is still current.
    pub fn apply_spouse(&mut self, probe: SpouseProbe) -> Option<AnchorTicket> {
        if probe.request.generation != self.generation {
            debug!(
                "event=spouse_toggle module=navigation status=stale target={}",
                probe.request.target
            );
            return None;
        }
        if !probe.exists {
            debug!(
                "event=spouse_toggle module=navigation status=absent target={}",
                probe.request.target
            );
            return None;
        }
        Some(self.set_anchor(probe.request.target, true))
    }

    /// Navigates to the tile at `index` of the open grid.
    pub fn tap_tile(&mut self, index: usize) -> Option<AnchorTicket> {
        let id = self.grid.as_ref()?.cards.get(index)?.id.clone();
        Some(self.set_anchor(id, true))
    }

    /// Closes an open grid, otherwise pops history.
    pub fn back(&mut self) -> BackResult {
        if self.close_grid() {
            return BackResult::GridClosed;
        }
        match self.history.pop() {
            Some(previous) => BackResult::Navigated(self.set_anchor(previous, false)),
            None => BackResult::Ignored,
        }
    }

    /// Runs the soft-edit command for the anchor and persists its result.
    pub async fn long_press(&mut self) -> NavResult<DispatchOutcome> {
        if self.grid.is_some() {
            return Ok(DispatchOutcome::Ignored);
        }
        let Some(editor) = self.editor.as_ref() else {
            return Ok(DispatchOutcome::Ignored);
        };

        let id = self.anchor.id.clone();
        let current = self.meta.meta(&id);
        match editor.request_edit(&id, &current).await {
            EditResult::Cancelled => Ok(DispatchOutcome::EditCancelled),
            EditResult::Saved(meta) => {
                let status = self.meta.save(&id, meta).await?;
                if self.anchor.id == id {
                    self.anchor.display_name = self.meta.label(&id);
                }
                Ok(DispatchOutcome::MetadataSaved(status))
            }
        }
    }

    /// Runs one intent through both phases.
    pub async fn dispatch(&mut self, intent: Intent) -> NavResult<DispatchOutcome> {
        match intent {
            Intent::Swipe(SwipeDirection::Down) => self.open_grid(GridKind::Children).await,
            Intent::Swipe(SwipeDirection::Left) => self.open_grid(GridKind::Siblings).await,
            Intent::Swipe(SwipeDirection::Up) => self.open_grid(GridKind::Parents).await,
            Intent::Swipe(SwipeDirection::Right) => Ok(self.toggle_spouse().await),
            Intent::TapTile(index) => match self.tap_tile(index) {
                Some(ticket) => Ok(self.finish_navigation(ticket).await),
                None => Ok(DispatchOutcome::Ignored),
            },
            Intent::Back => match self.back() {
                BackResult::GridClosed => Ok(DispatchOutcome::GridClosed),
                BackResult::Navigated(ticket) => Ok(self.finish_navigation(ticket).await),
                BackResult::Ignored => Ok(DispatchOutcome::Ignored),
            },
            Intent::LongPress => self.long_press().await,
        }
    }

    async fn open_grid(&mut self, kind: GridKind) -> NavResult<DispatchOutcome> {
        let Some(request) = self.request_grid(kind)? else {
            return Ok(DispatchOutcome::Ignored);
        };
        let result = self.resolve_grid(request).await;
        let cards = result.cards.len();
        if self.apply_grid(result) {
            Ok(DispatchOutcome::GridOpened { kind, cards })
        } else {
            Ok(DispatchOutcome::Ignored)
        }
    }

    async fn toggle_spouse(&mut self) -> DispatchOutcome {
        let Some(request) = self.request_spouse() else {
            return DispatchOutcome::Ignored;
        };
        let probe = self.probe_spouse(request).await;
        match self.apply_spouse(probe) {
            Some(ticket) => self.finish_navigation(ticket).await,
            None => DispatchOutcome::Ignored,
        }
    }

    async fn finish_navigation(&mut self, ticket: AnchorTicket) -> DispatchOutcome {
        let id = ticket.id.clone();
        let load = self.load_anchor(ticket).await;
        self.apply_anchor(load);
        DispatchOutcome::Navigated(id)
    }
}
