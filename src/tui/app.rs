use super::command::Command;
use super::forms::{CreateForm, DeleteTarget, EditField, EditForm, TextInput};
use super::message::Message;
use crate::data::{
    BacklogTab, ListKey, ListRegistry, Mode, MoveTree, SprintSlots, SprintTab, StateCategories,
    WorkItem, WorkItemId, WorkItemList, PAGE_SIZE,
};
use chrono::{DateTime, Local};
use std::collections::{HashMap, HashSet, VecDeque};

/// Braille spinner frames for loading animation
pub const SPINNER_FRAMES: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// Rows taken by everything except the list body.
pub const FIXED_CHROME: u16 = 8;
pub const MIN_CONTENT_HEIGHT: usize = 5;
/// Rows moved by page up/down.
pub const PAGE_JUMP: isize = 10;
/// Status messages kept in history.
pub const STATUS_HISTORY: usize = 100;

/// Active view. Each variant carries only the state that view needs.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ViewState {
    #[default]
    Loading,
    List,
    Detail {
        id: WorkItemId,
        scroll: u16,
    },
    StatePicker {
        targets: Vec<WorkItemId>,
        work_item_type: String,
        states: Vec<String>,
        cursor: usize,
        batch: bool,
    },
    SprintPicker {
        targets: Vec<WorkItemId>,
        cursor: usize,
        batch: bool,
    },
    BatchEditMenu {
        cursor: usize,
    },
    MoveChildrenConfirm {
        parent: WorkItemId,
        tree: MoveTree,
        iteration_path: String,
        sprint_name: String,
    },
    Find(TextInput),
    Filter(TextInput),
    Help,
    Edit(EditForm),
    Create(CreateForm),
    DeleteConfirm(DeleteTarget),
    Error(String),
}

impl ViewState {
    /// Modal flows that operate on the batch selection.
    pub fn is_batch_flow(&self) -> bool {
        match self {
            ViewState::StatePicker { batch, .. } | ViewState::SprintPicker { batch, .. } => *batch,
            ViewState::BatchEditMenu { .. } => true,
            ViewState::DeleteConfirm(target) => target.is_batch(),
            _ => false,
        }
    }

    /// Same screen as `other`, ignoring the detail view's scroll offset.
    pub fn is_same_screen(&self, other: &ViewState) -> bool {
        match (self, other) {
            (ViewState::Detail { id: a, .. }, ViewState::Detail { id: b, .. }) => a == b,
            _ => self == other,
        }
    }
}

/// Batch edit menu entries.
pub const BATCH_EDIT_OPTIONS: [&str; 2] = ["State", "Sprint"];

/// A state picker waiting for its work item type's states to load.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PendingPicker {
    pub targets: Vec<WorkItemId>,
    pub work_item_type: String,
    pub batch: bool,
    /// View the picker was requested from; leaving it cancels the picker
    pub origin: ViewState,
}

/// Progress of one sprint move fan-out.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMove {
    pub iteration_path: String,
    pub sprint_name: String,
    pub operation_count: usize,
    pub received: usize,
    pub failures: usize,
}

/// Last completed action, shown with its time until aged out.
#[derive(Debug, Clone, PartialEq)]
pub struct LastAction {
    pub text: String,
    pub at: DateTime<Local>,
    age: u8,
}

pub struct App {
    /// Header label (organisation / project / team)
    pub title: String,
    pub lists: ListRegistry,
    pub mode: Mode,
    pub sprint_tab: SprintTab,
    pub backlog_tab: BacklogTab,
    pub sprints: SprintSlots,
    pub view: ViewState,

    pub selection: HashSet<WorkItemId>,
    pub pending_moves: HashMap<u64, PendingMove>,
    next_operation: u64,

    /// State name to category, merged over every loaded type
    pub state_categories: StateCategories,
    /// States per work item type, in workflow order
    pub type_states: HashMap<String, Vec<String>>,
    requested_types: HashSet<String>,
    pub(crate) pending_picker: Option<PendingPicker>,
    /// Detail view to return to when help closes
    help_return: Option<ViewState>,

    /// Created item to put the cursor on once its list reloads
    pub(crate) pending_created: Option<(ListKey, WorkItemId)>,

    pub width: u16,
    pub height: u16,
    pub spinner_frame: usize,
    in_flight: usize,

    pub status: Option<String>,
    pub status_log: VecDeque<String>,
    pub last_action: Option<LastAction>,
    pub should_quit: bool,
}

impl App {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            lists: ListRegistry::new(),
            mode: Mode::Sprint,
            sprint_tab: SprintTab::Current,
            backlog_tab: BacklogTab::Recent,
            sprints: SprintSlots::default(),
            view: ViewState::Loading,
            selection: HashSet::new(),
            pending_moves: HashMap::new(),
            next_operation: 0,
            state_categories: StateCategories::new(),
            type_states: HashMap::new(),
            requested_types: HashSet::new(),
            pending_picker: None,
            help_return: None,
            pending_created: None,
            width: 80,
            height: 24,
            spinner_frame: 0,
            in_flight: 0,
            status: None,
            status_log: VecDeque::new(),
            last_action: None,
            should_quit: false,
        }
    }

    /// Commands to issue at startup.
    pub fn init(&mut self) -> Vec<Command> {
        self.track(vec![Command::LoadSprints {
            force_reload: false,
        }])
    }

    /// Process a message (Elm Architecture update function).
    ///
    /// Total: every message is handled without failing. Returns the commands
    /// to run next.
    pub fn update(&mut self, msg: Message) -> Vec<Command> {
        if msg.is_result() {
            self.in_flight = self.in_flight.saturating_sub(1);
        }
        if msg.is_user_action() {
            self.age_last_action();
        }

        let commands = match msg {
            // ─────────────────────────────────────────────────────────────────
            // App lifecycle
            // ─────────────────────────────────────────────────────────────────
            Message::Quit => {
                self.should_quit = true;
                Vec::new()
            }
            Message::Tick => {
                self.tick_spinner();
                Vec::new()
            }
            Message::Resize { width, height } => {
                self.width = width;
                self.height = height;
                let h = self.content_height();
                self.current_list_mut().adjust_scroll(h);
                Vec::new()
            }
            Message::Reload => {
                let mut commands = self.reload_current();
                if let ViewState::Detail { id, .. } = self.view {
                    commands.push(Command::RefreshWorkItem { id });
                }
                commands
            }
            Message::ReloadSprints => {
                self.begin_operation();
                self.set_status("Reloading sprints");
                vec![Command::LoadSprints { force_reload: true }]
            }
            Message::OpenInBrowser => match self.focused_item_id() {
                Some(id) => vec![Command::OpenInBrowser { id }],
                None => Vec::new(),
            },

            // ─────────────────────────────────────────────────────────────────
            // Navigation
            // ─────────────────────────────────────────────────────────────────
            Message::MoveUp => self.move_cursor(-1),
            Message::MoveDown => self.move_cursor(1),
            Message::PageUp => self.move_cursor(-PAGE_JUMP),
            Message::PageDown => self.move_cursor(PAGE_JUMP),
            Message::GotoTop => {
                let h = self.content_height();
                self.current_list_mut().go_to_top(h);
                Vec::new()
            }
            Message::GotoBottom => {
                let h = self.content_height();
                self.current_list_mut().go_to_bottom(h);
                Vec::new()
            }
            Message::Activate => self.activate(),
            Message::NextTab => self.cycle_tab(1),
            Message::PrevTab => self.cycle_tab(-1),
            Message::SelectTab(index) => match ListKey::tabs(self.mode).get(index) {
                Some(&key) => self.switch_to(key),
                None => Vec::new(),
            },
            Message::ToggleMode => {
                let key = match self.mode.toggle() {
                    Mode::Sprint => ListKey::Sprint(self.sprint_tab),
                    Mode::Backlog => ListKey::Backlog(self.backlog_tab),
                };
                self.switch_to(key)
            }

            // ─────────────────────────────────────────────────────────────────
            // List actions
            // ─────────────────────────────────────────────────────────────────
            Message::ToggleSelection => {
                self.toggle_selection();
                Vec::new()
            }
            Message::ClearSelectionOrFilter => {
                if !self.selection.is_empty() {
                    self.selection.clear();
                    self.set_status("Selection cleared");
                } else if self.current_list().is_some_and(WorkItemList::filter_active) {
                    self.current_list_mut().clear_filter();
                    self.set_status("Filter cleared");
                }
                Vec::new()
            }
            Message::OpenHelp => {
                let previous = std::mem::replace(&mut self.view, ViewState::Help);
                self.help_return =
                    matches!(previous, ViewState::Detail { .. }).then_some(previous);
                Vec::new()
            }
            Message::OpenFilter => {
                self.open_filter();
                Vec::new()
            }
            Message::OpenFind => {
                self.view = ViewState::Find(TextInput::default());
                Vec::new()
            }
            Message::OpenStatePicker => self.open_state_picker(),
            Message::OpenEditMenu => self.open_edit_menu(),
            Message::OpenSprintPicker => {
                self.open_sprint_picker();
                Vec::new()
            }
            Message::OpenEdit => {
                self.open_edit();
                Vec::new()
            }
            Message::BeginCreate { after } => {
                self.begin_create(after);
                Vec::new()
            }
            Message::OpenDeleteConfirm => {
                self.open_delete_confirm();
                Vec::new()
            }

            // ─────────────────────────────────────────────────────────────────
            // Modal views
            // ─────────────────────────────────────────────────────────────────
            Message::Close => {
                self.close_view();
                Vec::new()
            }
            Message::MenuUp => {
                self.move_menu_cursor(-1);
                Vec::new()
            }
            Message::MenuDown => {
                self.move_menu_cursor(1);
                Vec::new()
            }
            Message::MenuConfirm => self.confirm_menu(),
            Message::MoveChildren(include_children) => self.confirm_move_children(include_children),
            Message::ConfirmDelete => self.confirm_delete(),
            Message::ScrollDetail(delta) => {
                if let ViewState::Detail { scroll, .. } = &mut self.view {
                    *scroll = (i32::from(*scroll) + delta).clamp(0, i32::from(u16::MAX)) as u16;
                }
                Vec::new()
            }

            // ─────────────────────────────────────────────────────────────────
            // Text input
            // ─────────────────────────────────────────────────────────────────
            Message::InputChar(c) => {
                self.edit_input(|input| input.insert(c));
                Vec::new()
            }
            Message::InputBackspace => {
                self.edit_input(TextInput::backspace);
                Vec::new()
            }
            Message::InputNewline => {
                if let ViewState::Edit(form) = &mut self.view {
                    if form.focus == EditField::Description {
                        form.description.insert('\n');
                    }
                }
                Vec::new()
            }
            Message::InputLeft => {
                self.edit_input(TextInput::left);
                Vec::new()
            }
            Message::InputRight => {
                self.edit_input(TextInput::right);
                Vec::new()
            }
            Message::SwitchField => {
                if let ViewState::Edit(form) = &mut self.view {
                    form.switch_focus();
                }
                Vec::new()
            }
            Message::SubmitForm => self.submit_form(),

            // ─────────────────────────────────────────────────────────────────
            // Command results
            // ─────────────────────────────────────────────────────────────────
            Message::SprintsLoaded {
                result,
                force_reload,
            } => self.on_sprints_loaded(result, force_reload),
            Message::TasksLoaded {
                target,
                generation,
                append,
                sprint_path,
                result,
            } => self.on_tasks_loaded(target, generation, append, &sprint_path, result),
            Message::StatesLoaded {
                work_item_type,
                result,
            } => self.on_states_loaded(work_item_type, result),
            Message::StateUpdated { id, state, result } => {
                self.on_state_updated(id, &state, result)
            }
            Message::WorkItemUpdated { id, result } => self.on_work_item_updated(id, result),
            Message::WorkItemRefreshed { id, result } => {
                self.on_work_item_refreshed(id, result);
                Vec::new()
            }
            Message::WorkItemCreated { target, result } => self.on_work_item_created(target, result),
            Message::WorkItemDeleted { id, result } => {
                self.on_work_item_deleted(id, result);
                Vec::new()
            }
            Message::SprintUpdated {
                operation,
                id,
                result,
            } => self.on_sprint_updated(operation, id, result),
            Message::BrowserOpened { result } => {
                if let Err(e) = result {
                    self.set_status(format!("Could not open browser: {e}"));
                }
                Vec::new()
            }

            // ─────────────────────────────────────────────────────────────────
            // No-op
            // ─────────────────────────────────────────────────────────────────
            Message::None => Vec::new(),
        };

        if self
            .pending_picker
            .as_ref()
            .is_some_and(|p| !self.view.is_same_screen(&p.origin))
        {
            tracing::debug!("Dropping state picker request after view change");
            self.pending_picker = None;
        }
        self.track(commands)
    }

    /// Count commands in flight for the spinner.
    fn track(&mut self, commands: Vec<Command>) -> Vec<Command> {
        self.in_flight += commands.len();
        commands
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight > 0
    }

    /// Advance spinner frame (call on tick while loading)
    pub fn tick_spinner(&mut self) {
        if self.is_busy() {
            self.spinner_frame = (self.spinner_frame + 1) % SPINNER_FRAMES.len();
        }
    }

    /// Get current spinner character
    pub fn spinner_char(&self) -> char {
        SPINNER_FRAMES[self.spinner_frame % SPINNER_FRAMES.len()]
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Status
    // ─────────────────────────────────────────────────────────────────────────

    pub fn set_status(&mut self, text: impl Into<String>) {
        let text = text.into();
        tracing::info!("{}", text);
        if self.status_log.len() == STATUS_HISTORY {
            self.status_log.pop_front();
        }
        self.status_log.push_back(text.clone());
        self.status = Some(text);
    }

    /// Clear the status line as a new operation starts.
    pub(crate) fn begin_operation(&mut self) {
        self.status = None;
    }

    pub(crate) fn log_action(&mut self, text: impl Into<String>) {
        self.last_action = Some(LastAction {
            text: text.into(),
            at: Local::now(),
            age: 0,
        });
    }

    fn age_last_action(&mut self) {
        if let Some(action) = &mut self.last_action {
            action.age += 1;
            if action.age > 1 {
                self.last_action = None;
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lists and tabs
    // ─────────────────────────────────────────────────────────────────────────

    pub fn current_key(&self) -> ListKey {
        match self.mode {
            Mode::Sprint => ListKey::Sprint(self.sprint_tab),
            Mode::Backlog => ListKey::Backlog(self.backlog_tab),
        }
    }

    pub fn current_list(&self) -> Option<&WorkItemList> {
        self.lists.get(self.current_key())
    }

    pub fn current_list_mut(&mut self) -> &mut WorkItemList {
        self.lists.get_mut(self.current_key())
    }

    /// Rows available to the list body.
    pub fn content_height(&self) -> usize {
        usize::from(self.height.saturating_sub(FIXED_CHROME)).max(MIN_CONTENT_HEIGHT)
    }

    pub fn selected_item(&self) -> Option<&WorkItem> {
        self.current_list().and_then(WorkItemList::selected_item)
    }

    /// View drawn behind the help overlay, or the current view.
    pub fn background_view(&self) -> &ViewState {
        match (&self.view, &self.help_return) {
            (ViewState::Help, Some(previous)) => previous,
            _ => &self.view,
        }
    }

    /// Item the user is looking at: the detail item or the one under the cursor.
    pub fn focused_item_id(&self) -> Option<WorkItemId> {
        match &self.view {
            ViewState::Detail { id, .. } => Some(*id),
            _ => self.selected_item().map(|i| i.id),
        }
    }

    pub fn find_item(&self, id: WorkItemId) -> Option<&WorkItem> {
        self.lists.find_item(self.current_key(), id)
    }

    /// Path the loader for `key` needs; `None` when the sprint slot is empty.
    pub fn sprint_path_for(&self, key: ListKey) -> Option<String> {
        match key {
            ListKey::Sprint(tab) => self.sprints.path(tab).map(str::to_string),
            ListKey::Backlog(_) => Some(
                self.sprints
                    .path(SprintTab::Current)
                    .unwrap_or("")
                    .to_string(),
            ),
        }
    }

    fn move_cursor(&mut self, delta: isize) -> Vec<Command> {
        let h = self.content_height();
        self.current_list_mut().move_cursor(delta, h);
        Vec::new()
    }

    fn activate(&mut self) -> Vec<Command> {
        let Some(list) = self.current_list() else {
            return Vec::new();
        };
        if list.cursor_on_load_more() {
            return self.load_more();
        }
        match list.selected_item().map(|i| i.id) {
            Some(id) => {
                self.view = ViewState::Detail { id, scroll: 0 };
                vec![Command::RefreshWorkItem { id }]
            }
            None => Vec::new(),
        }
    }

    fn cycle_tab(&mut self, step: isize) -> Vec<Command> {
        let tabs = ListKey::tabs(self.mode);
        let current = tabs
            .iter()
            .position(|k| *k == self.current_key())
            .unwrap_or(0);
        let len = tabs.len() as isize;
        let next = (current as isize + step).rem_euclid(len) as usize;
        self.switch_to(tabs[next])
    }

    /// Re-point the current tab. The list left behind is not touched.
    pub fn switch_to(&mut self, key: ListKey) -> Vec<Command> {
        match key {
            ListKey::Sprint(tab) => {
                self.mode = Mode::Sprint;
                self.sprint_tab = tab;
            }
            ListKey::Backlog(tab) => {
                self.mode = Mode::Backlog;
                self.backlog_tab = tab;
            }
        }
        if self.lists.get(key).is_some_and(WorkItemList::attempted) {
            Vec::new()
        } else {
            self.load_list(key)
        }
    }

    fn reload_current(&mut self) -> Vec<Command> {
        self.begin_operation();
        let key = self.current_key();
        self.set_status(format!("Reloading {}", key.label()));
        self.load_list(key)
    }

    /// Issue a replace-load for `key`.
    pub(crate) fn load_list(&mut self, key: ListKey) -> Vec<Command> {
        let Some(sprint_path) = self.sprint_path_for(key) else {
            let list = self.lists.get_mut(key);
            list.begin_load();
            list.replace(Vec::new(), 0);
            list.reset_cursor();
            self.set_status(format!("No {} sprint", key.label().to_lowercase()));
            if self.view == ViewState::Loading && key == self.current_key() {
                self.view = ViewState::List;
            }
            return Vec::new();
        };

        let generation = self.lists.get_mut(key).begin_load();
        tracing::debug!("Loading {:?} (generation {})", key, generation);
        vec![Command::LoadTasks {
            target: key,
            generation,
            sprint_path,
            exclude: None,
            limit: PAGE_SIZE,
        }]
    }

    /// Append the next page, excluding everything already loaded.
    fn load_more(&mut self) -> Vec<Command> {
        let key = self.current_key();
        let Some(sprint_path) = self.sprint_path_for(key) else {
            return Vec::new();
        };
        let list = self.lists.get_mut(key);
        if list.is_loading() {
            return Vec::new();
        }
        let exclude = list.ids();
        let generation = list.begin_append();
        self.begin_operation();
        vec![Command::LoadTasks {
            target: key,
            generation,
            sprint_path,
            exclude: Some(exclude),
            limit: PAGE_SIZE,
        }]
    }

    /// Issue a states load for each type not yet requested.
    pub(crate) fn request_states<'a>(
        &mut self,
        types: impl IntoIterator<Item = &'a str>,
    ) -> Vec<Command> {
        let mut commands = Vec::new();
        for work_item_type in types {
            if work_item_type.is_empty() || self.requested_types.contains(work_item_type) {
                continue;
            }
            self.requested_types.insert(work_item_type.to_string());
            commands.push(Command::LoadStates {
                work_item_type: work_item_type.to_string(),
            });
        }
        commands
    }

    pub(crate) fn forget_requested_type(&mut self, work_item_type: &str) {
        self.requested_types.remove(work_item_type);
    }

    pub(crate) fn next_operation_id(&mut self) -> u64 {
        self.next_operation += 1;
        self.next_operation
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Views
    // ─────────────────────────────────────────────────────────────────────────

    /// Esc from any modal: back to the list, dropping a batch selection.
    fn close_view(&mut self) {
        let view = std::mem::replace(&mut self.view, ViewState::List);
        if view.is_batch_flow() {
            self.selection.clear();
        }
        match view {
            ViewState::Filter(_) => self.current_list_mut().clear_filter(),
            ViewState::Loading => self.view = ViewState::Loading,
            ViewState::StatePicker { .. } | ViewState::SprintPicker { .. } => {
                self.pending_picker = None;
            }
            ViewState::Help => {
                if let Some(previous) = self.help_return.take() {
                    self.view = previous;
                }
            }
            _ => {}
        }
    }

    fn menu_len(&self) -> usize {
        match &self.view {
            ViewState::StatePicker { states, .. } => states.len(),
            ViewState::SprintPicker { .. } => self.sprints.available().len(),
            ViewState::BatchEditMenu { .. } => BATCH_EDIT_OPTIONS.len(),
            _ => 0,
        }
    }

    fn move_menu_cursor(&mut self, delta: isize) {
        let len = self.menu_len();
        let cursor = match &mut self.view {
            ViewState::StatePicker { cursor, .. }
            | ViewState::SprintPicker { cursor, .. }
            | ViewState::BatchEditMenu { cursor } => cursor,
            _ => return,
        };
        if len == 0 {
            *cursor = 0;
            return;
        }
        *cursor = cursor.saturating_add_signed(delta).min(len - 1);
    }

    fn confirm_menu(&mut self) -> Vec<Command> {
        match self.view.clone() {
            ViewState::StatePicker {
                targets,
                states,
                cursor,
                batch,
                ..
            } => match states.get(cursor) {
                Some(state) => self.apply_state(&targets, state, batch),
                None => Vec::new(),
            },
            ViewState::BatchEditMenu { cursor } => match BATCH_EDIT_OPTIONS.get(cursor) {
                Some(&"State") => self.open_state_picker(),
                Some(_) => {
                    self.open_sprint_picker();
                    Vec::new()
                }
                None => Vec::new(),
            },
            ViewState::SprintPicker {
                targets,
                cursor,
                batch,
            } => {
                let Some(sprint) = self
                    .sprints
                    .available()
                    .get(cursor)
                    .map(|(_, s)| (*s).clone())
                else {
                    return Vec::new();
                };
                self.move_to_sprint(targets, &sprint, batch)
            }
            _ => Vec::new(),
        }
    }

    /// Route text editing to whichever input the view owns.
    fn edit_input(&mut self, edit: impl FnOnce(&mut TextInput)) {
        match &mut self.view {
            ViewState::Find(input) => edit(input),
            ViewState::Filter(input) => {
                edit(input);
                let query = input.value().to_string();
                self.current_list_mut().set_filter(&query);
            }
            ViewState::Edit(form) => {
                edit(form.focused_mut());
                form.error = None;
            }
            ViewState::Create(form) => {
                edit(&mut form.input);
                form.error = None;
            }
            _ => {}
        }
    }

    fn submit_form(&mut self) -> Vec<Command> {
        match &self.view {
            ViewState::Filter(_) => {
                self.view = match self.selected_item() {
                    Some(item) => ViewState::Detail {
                        id: item.id,
                        scroll: 0,
                    },
                    None => ViewState::List,
                };
                match self.view {
                    ViewState::Detail { id, .. } => vec![Command::RefreshWorkItem { id }],
                    _ => Vec::new(),
                }
            }
            ViewState::Find(_) => self.submit_find(),
            ViewState::Edit(_) => self.submit_edit(),
            ViewState::Create(_) => self.submit_create(),
            _ => Vec::new(),
        }
    }
}
