//! Form state carried by the edit, create, delete, filter and find views.

use crate::backend::WorkItemUpdate;
use crate::data::{ListKey, WorkItemId};

/// Single or multi-line text buffer with a character cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    value: String,
    /// Cursor position in characters
    cursor: usize,
}

impl TextInput {
    pub fn new(value: &str) -> Self {
        Self {
            value: value.to_string(),
            cursor: value.chars().count(),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    pub fn insert(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.value.insert(at, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let at = self.byte_index(self.cursor);
        self.value.remove(at);
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.value.chars().count());
    }

    /// Text before and after the cursor, for rendering.
    pub fn split_at_cursor(&self) -> (&str, &str) {
        self.value.split_at(self.byte_index(self.cursor))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditField {
    #[default]
    Title,
    Description,
}

/// Title/description editor opened from the detail view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditForm {
    pub id: WorkItemId,
    pub title: TextInput,
    pub description: TextInput,
    pub focus: EditField,
    original_title: String,
    original_description: String,
    pub error: Option<String>,
}

impl EditForm {
    /// `description` is the plain-text rendering of the stored value.
    pub fn new(id: WorkItemId, title: &str, description: &str) -> Self {
        Self {
            id,
            title: TextInput::new(title),
            description: TextInput::new(description),
            focus: EditField::Title,
            original_title: title.to_string(),
            original_description: description.to_string(),
            error: None,
        }
    }

    pub fn focused_mut(&mut self) -> &mut TextInput {
        match self.focus {
            EditField::Title => &mut self.title,
            EditField::Description => &mut self.description,
        }
    }

    pub fn switch_focus(&mut self) {
        self.focus = match self.focus {
            EditField::Title => EditField::Description,
            EditField::Description => EditField::Title,
        };
    }

    /// Only the fields that differ from what was loaded.
    pub fn changes(&self) -> WorkItemUpdate {
        let title = self.title.value().trim();
        WorkItemUpdate {
            title: (title != self.original_title.trim()).then(|| title.to_string()),
            description: (self.description.value() != self.original_description)
                .then(|| crate::util::text_to_html(self.description.value())),
        }
    }
}

/// Inline create row. `row` is where it renders in the flattened tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateForm {
    pub list: ListKey,
    pub input: TextInput,
    pub row: usize,
    pub depth: usize,
    pub parent_id: Option<WorkItemId>,
    pub work_item_type: String,
    pub iteration_path: Option<String>,
    pub area_path: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteTarget {
    Single { id: WorkItemId, title: String },
    Batch(Vec<WorkItemId>),
}

impl DeleteTarget {
    pub fn ids(&self) -> Vec<WorkItemId> {
        match self {
            DeleteTarget::Single { id, .. } => vec![*id],
            DeleteTarget::Batch(ids) => ids.clone(),
        }
    }

    pub fn is_batch(&self) -> bool {
        matches!(self, DeleteTarget::Batch(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_input_editing() {
        let mut input = TextInput::new("héllo");
        assert_eq!(input.cursor(), 5);
        input.left();
        input.left();
        input.insert('X');
        assert_eq!(input.value(), "hélXlo");
        input.backspace();
        input.backspace();
        assert_eq!(input.value(), "hélo");
        assert_eq!(input.split_at_cursor(), ("hé", "lo"));
        for _ in 0..10 {
            input.right();
        }
        assert_eq!(input.cursor(), 4);
    }

    #[test]
    fn test_edit_form_reports_only_changed_fields() {
        let mut form = EditForm::new(1, "Title", "Body");
        assert!(form.changes().is_empty());

        form.focused_mut().insert('!');
        let changes = form.changes();
        assert_eq!(changes.title.as_deref(), Some("Title!"));
        assert!(changes.description.is_none());

        form.switch_focus();
        form.focused_mut().insert('?');
        assert_eq!(form.changes().description.as_deref(), Some("Body?"));
    }

    #[test]
    fn test_delete_target_ids() {
        let single = DeleteTarget::Single {
            id: 4,
            title: "x".to_string(),
        };
        assert_eq!(single.ids(), vec![4]);
        assert!(!single.is_batch());
        assert!(DeleteTarget::Batch(vec![1, 2]).is_batch());
    }
}
