pub mod color;
pub mod help;
pub mod item_view;
pub mod journey_list;
pub mod reason_prompt;
pub mod status_bar;
pub mod tabs;
pub mod task_list;
