mod component;
mod controller;
mod html;
mod member;
mod parser;
mod route;
mod syntax;

pub use component::{bind_controller, parse_binding, parse_components, DEFAULT_CONTROLLER_AS};
pub use controller::parse_controllers;
pub use html::parse_tag_usages;
pub use member::extract_members;
pub use parser::{SourceFile, SourceLanguage, SourceParser};
pub use route::{first_custom_tag, parse_routes};
pub use syntax::{NodeKind, MAX_DEPTH};

#[cfg(test)]
mod tests;
