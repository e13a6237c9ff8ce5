//! Message enum for Elm Architecture (TEA) pattern.
//!
//! Key events are mapped to intent messages by the input layer; commands
//! report back with result messages. Both flow through `App::update()`.

use crate::backend::TypeStates;
use crate::data::{ListKey, SprintSlots, WorkItem, WorkItemId};

/// Outcome of a command. Errors are already rendered to text.
pub type Outcome<T> = Result<T, String>;

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    // ─────────────────────────────────────────────────────────────────────────
    // App lifecycle
    // ─────────────────────────────────────────────────────────────────────────
    /// Quit the application
    Quit,
    /// Animation tick
    Tick,
    /// Terminal resized
    Resize { width: u16, height: u16 },
    /// Reload the current tab
    Reload,
    /// Reload sprint slots, resetting lists whose sprint changed
    ReloadSprints,
    /// Open the item under the cursor in the browser
    OpenInBrowser,

    // ─────────────────────────────────────────────────────────────────────────
    // Navigation
    // ─────────────────────────────────────────────────────────────────────────
    MoveUp,
    MoveDown,
    PageUp,
    PageDown,
    GotoTop,
    GotoBottom,
    /// Open the item under the cursor, or load more on the "Load More" row
    Activate,
    NextTab,
    PrevTab,
    /// Select a tab by position within the current mode
    SelectTab(usize),
    ToggleMode,

    // ─────────────────────────────────────────────────────────────────────────
    // List actions
    // ─────────────────────────────────────────────────────────────────────────
    ToggleSelection,
    /// Clear the batch selection, or the filter when nothing is selected
    ClearSelectionOrFilter,
    OpenHelp,
    OpenFilter,
    OpenFind,
    OpenStatePicker,
    /// `e` in the list: batch edit menu or state picker
    OpenEditMenu,
    OpenSprintPicker,
    /// `e` in the detail view
    OpenEdit,
    /// Inline create; `after` places the row after the current subtree
    BeginCreate { after: bool },
    OpenDeleteConfirm,

    // ─────────────────────────────────────────────────────────────────────────
    // Modal views
    // ─────────────────────────────────────────────────────────────────────────
    /// Return to the list (esc in modals, back from detail)
    Close,
    MenuUp,
    MenuDown,
    MenuConfirm,
    /// `y`/`n` in the move-children prompt
    MoveChildren(bool),
    ConfirmDelete,
    ScrollDetail(i32),

    // ─────────────────────────────────────────────────────────────────────────
    // Text input
    // ─────────────────────────────────────────────────────────────────────────
    InputChar(char),
    InputBackspace,
    InputNewline,
    InputLeft,
    InputRight,
    SwitchField,
    SubmitForm,

    // ─────────────────────────────────────────────────────────────────────────
    // Command results
    // ─────────────────────────────────────────────────────────────────────────
    SprintsLoaded {
        result: Outcome<SprintSlots>,
        force_reload: bool,
    },
    /// A page of items for `target`. `append` results extend the list.
    TasksLoaded {
        target: ListKey,
        generation: u64,
        append: bool,
        sprint_path: String,
        result: Outcome<(Vec<WorkItem>, usize)>,
    },
    StatesLoaded {
        work_item_type: String,
        result: Outcome<TypeStates>,
    },
    StateUpdated {
        id: WorkItemId,
        state: String,
        result: Outcome<()>,
    },
    WorkItemUpdated {
        id: WorkItemId,
        result: Outcome<()>,
    },
    WorkItemRefreshed {
        id: WorkItemId,
        result: Outcome<WorkItem>,
    },
    WorkItemCreated {
        target: ListKey,
        result: Outcome<WorkItem>,
    },
    WorkItemDeleted {
        id: WorkItemId,
        result: Outcome<()>,
    },
    SprintUpdated {
        operation: u64,
        id: WorkItemId,
        result: Outcome<()>,
    },
    BrowserOpened {
        result: Outcome<()>,
    },

    /// No operation (for unhandled keys)
    None,
}

impl Message {
    /// Whether this message reports the completion of a command.
    pub fn is_result(&self) -> bool {
        matches!(
            self,
            Message::SprintsLoaded { .. }
                | Message::TasksLoaded { .. }
                | Message::StatesLoaded { .. }
                | Message::StateUpdated { .. }
                | Message::WorkItemUpdated { .. }
                | Message::WorkItemRefreshed { .. }
                | Message::WorkItemCreated { .. }
                | Message::WorkItemDeleted { .. }
                | Message::SprintUpdated { .. }
                | Message::BrowserOpened { .. }
        )
    }

    /// Whether this message came from a key press.
    pub fn is_user_action(&self) -> bool {
        !self.is_result()
            && !matches!(self, Message::Tick | Message::Resize { .. } | Message::None)
    }
}
