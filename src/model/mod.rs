pub mod component;
pub mod controller;
pub mod html;
pub mod key;
pub mod route;
pub mod span;

pub use component::{Artifact, Binding, BindingKind, Component, Route, Template};
pub use controller::{Controller, Member, MemberKind, Parameter};
pub use html::TagUsage;
pub use key::EntityKey;
pub use route::{RouteDeclaration, RouteSource};
pub use span::Span;
