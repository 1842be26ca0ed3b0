pub mod game_ui;
pub mod input;
pub mod layout;
pub mod widgets;

pub use game_ui::{BoardState, GameUI, GameUIAction};
pub use input::{InputEffect, InputState, UiCommand};
pub use layout::BoardLayout;
pub use widgets::BoardWidget;
