/// Emitted when the user submits a prompt from the input row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submit {
    pub text: String,
}

impl Submit {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Emitted when a suggested follow-up button is clicked; re-enters the
/// submit path with the topic text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicPicked {
    pub text: String,
}

/// Emitted when a star is clicked on the settled reply at `index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingClicked {
    pub index: usize,
    pub stars: u8,
}

/// Emitted when the sidebar sign-out button is clicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignOutClicked;
