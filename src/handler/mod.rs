mod completion;
mod definition;
mod references;

pub use completion::CompletionHandler;
pub use definition::DefinitionHandler;
pub use references::ReferencesHandler;
