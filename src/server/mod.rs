mod progress;
pub mod workspace;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{watch, Mutex, RwLock};
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

use crate::config::{ComponentsConfig, SETTINGS_SECTION};
use crate::error::ScanError;
use crate::handler::{CompletionHandler, DefinitionHandler, ReferencesHandler};
use crate::index::{EntityIndex, IndexSnapshot, SourceFilesScanner};

use progress::Progress;
use workspace::{component_summary, file_change, file_watchers, path_of, workspace_root, WatchedKinds};

/// 全体再インデックスのコマンド
pub const REFRESH_COMMAND: &str = "ngComponents.refresh";
/// インデックス済みコンポーネント一覧のコマンド
pub const LIST_COMPONENTS_COMMAND: &str = "ngComponents.listComponents";

const WATCHER_REGISTRATION_ID: &str = "ngComponents-file-watchers";

pub struct Backend {
    client: Client,
    /// 書き込みはこのロック越しのみ
    index: Arc<Mutex<EntityIndex>>,
    snapshots: watch::Receiver<Arc<IndexSnapshot>>,
    scanner: RwLock<SourceFilesScanner>,
    config: RwLock<ComponentsConfig>,
    watched: RwLock<Option<WatchedKinds>>,
    documents: DashMap<Url, String>,
}

impl Backend {
    pub fn new(client: Client) -> Self {
        let index = EntityIndex::new();
        let snapshots = index.subscribe();
        Self {
            client,
            index: Arc::new(Mutex::new(index)),
            snapshots,
            scanner: RwLock::new(SourceFilesScanner::default()),
            config: RwLock::new(ComponentsConfig::default()),
            watched: RwLock::new(None),
            documents: DashMap::new(),
        }
    }

    fn snapshot(&self) -> Arc<IndexSnapshot> {
        self.snapshots.borrow().clone()
    }

    async fn scanner(&self) -> SourceFilesScanner {
        self.scanner.read().await.clone()
    }

    /// 開いているドキュメントのテキスト（なければディスクから読む）
    async fn document_text(&self, uri: &Url) -> Option<String> {
        if let Some(text) = self.documents.get(uri) {
            return Some(text.value().clone());
        }
        let path = path_of(uri)?;
        tokio::fs::read_to_string(path).await.ok()
    }

    /// 設定からファイル種類の振り分けを作り直す
    async fn update_watched_kinds(&self) {
        let config = self.config.read().await.clone();
        match WatchedKinds::from_config(&config) {
            Ok(watched) => *self.watched.write().await = Some(watched),
            Err(e) => {
                *self.watched.write().await = None;
                self.client
                    .log_message(MessageType::ERROR, format!("Invalid file patterns: {}", e))
                    .await;
            }
        }
    }

    /// ファイル監視を（再）登録する
    async fn register_file_watchers(&self, replace: bool) {
        if replace {
            let _ = self
                .client
                .unregister_capability(vec![Unregistration {
                    id: WATCHER_REGISTRATION_ID.to_string(),
                    method: "workspace/didChangeWatchedFiles".to_string(),
                }])
                .await;
        }

        let config = self.config.read().await.clone();
        let options = DidChangeWatchedFilesRegistrationOptions {
            watchers: file_watchers(&config),
        };
        let register_options = match serde_json::to_value(options) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Failed to serialize watcher options: {}", e);
                return;
            }
        };

        let registration = Registration {
            id: WATCHER_REGISTRATION_ID.to_string(),
            method: "workspace/didChangeWatchedFiles".to_string(),
            register_options: Some(register_options),
        };
        if let Err(e) = self.client.register_capability(vec![registration]).await {
            self.client
                .log_message(
                    MessageType::WARNING,
                    format!("Failed to register file watchers: {}", e),
                )
                .await;
        }
    }

    /// ワークスペース全体を再インデックスする
    ///
    /// 失敗した場合は以前のインデックスを保持したままユーザーに通知する。
    async fn refresh(&self) -> std::result::Result<Arc<IndexSnapshot>, ScanError> {
        let progress = Progress::begin(&self.client, "ngComponents/refresh", "Indexing components").await;
        progress.report("Scanning workspace", 10).await;

        let scanner = self.scanner().await;
        let config = self.config.read().await.clone();
        let result = {
            let mut index = self.index.lock().await;
            index.full_refresh(&scanner, &config).await
        };

        match &result {
            Ok(snapshot) => {
                let message = format!(
                    "Indexed {} components and {} controllers",
                    snapshot.components().len(),
                    snapshot.controllers().len()
                );
                self.client.log_message(MessageType::INFO, &message).await;
                progress.end(message).await;
            }
            Err(e) => {
                progress.end("Indexing failed").await;
                self.client
                    .show_message(MessageType::ERROR, format!("Component indexing failed: {}", e))
                    .await;
            }
        }
        result
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let root = workspace_root(&params);

        let mut config = root
            .as_deref()
            .map(ComponentsConfig::load_from_dir)
            .unwrap_or_default();
        if let Some(options) = params.initialization_options.as_ref() {
            if let Some(overrides) = ComponentsConfig::from_settings(options) {
                config = overrides;
            }
        }

        *self.scanner.write().await = SourceFilesScanner::new(root);
        *self.config.write().await = config;
        self.update_watched_kinds().await;

        Ok(InitializeResult {
            server_info: Some(ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                references_provider: Some(OneOf::Left(true)),
                definition_provider: Some(OneOf::Left(true)),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(vec!["<".to_string(), " ".to_string(), ".".to_string()]),
                    ..Default::default()
                }),
                execute_command_provider: Some(ExecuteCommandOptions {
                    commands: vec![REFRESH_COMMAND.to_string(), LIST_COMPONENTS_COMMAND.to_string()],
                    work_done_progress_options: Default::default(),
                }),
                ..Default::default()
            },
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        let scanner = self.scanner().await;
        match scanner.root() {
            Some(path) => {
                self.client
                    .log_message(MessageType::INFO, format!("Indexing workspace: {}", path.display()))
                    .await;
            }
            None => {
                self.client
                    .log_message(MessageType::WARNING, "No workspace root, components are not indexed")
                    .await;
                return;
            }
        }

        self.register_file_watchers(false).await;
        let _ = self.refresh().await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn execute_command(&self, params: ExecuteCommandParams) -> Result<Option<serde_json::Value>> {
        match params.command.as_str() {
            REFRESH_COMMAND => match self.refresh().await {
                Ok(snapshot) => {
                    let count = snapshot.components().len();
                    self.client
                        .show_message(MessageType::INFO, format!("Found {} components", count))
                        .await;
                    Ok(Some(serde_json::json!({ "success": true, "components": count })))
                }
                Err(e) => Ok(Some(serde_json::json!({ "success": false, "error": e.to_string() }))),
            },
            LIST_COMPONENTS_COMMAND => Ok(Some(component_summary(&self.snapshot()))),
            _ => {
                self.client
                    .log_message(
                        MessageType::WARNING,
                        format!("Unknown command: {}", params.command),
                    )
                    .await;
                Ok(None)
            }
        }
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        let Some(config) = ComponentsConfig::from_settings(&params.settings) else {
            tracing::debug!("Ignoring settings without a {} section", SETTINGS_SECTION);
            return;
        };

        let globs_changed = {
            let mut current = self.config.write().await;
            let changed = current.globs_changed(&config);
            *current = config;
            changed
        };

        if globs_changed {
            self.update_watched_kinds().await;
            self.register_file_watchers(true).await;
            let _ = self.refresh().await;
        }
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        let scanner = self.scanner().await;
        let Some(root) = scanner.root() else {
            return;
        };
        let Some(watched) = self.watched.read().await.clone() else {
            return;
        };

        // 到着順に1つのロックで適用する
        let mut index = self.index.lock().await;
        for event in params.changes {
            let (Some(path), Some(change)) = (path_of(&event.uri), file_change(event.typ)) else {
                continue;
            };
            for kind in watched.kinds_for(root, &path) {
                tracing::debug!("{:?} {:?}: {}", change, kind, path.display());
                index.apply_file_changed(&scanner, kind, &path, change).await;
            }
        }
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        self.documents
            .insert(params.text_document.uri, params.text_document.text);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        if let Some(change) = params.content_changes.into_iter().next() {
            self.documents.insert(params.text_document.uri, change.text);
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.documents.remove(&params.text_document.uri);
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let uri = &params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        let Some(text) = self.document_text(uri).await else {
            return Ok(None);
        };
        let targets = self.config.read().await.definition_targets.clone();

        let handler = DefinitionHandler::new(self.snapshot(), &targets);
        let locations = handler.goto_definition(uri, &text, position);
        if locations.is_empty() {
            return Ok(None);
        }
        Ok(Some(GotoDefinitionResponse::Array(locations)))
    }

    async fn references(&self, params: ReferenceParams) -> Result<Option<Vec<Location>>> {
        let uri = &params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;

        let Some(text) = self.document_text(uri).await else {
            return Ok(None);
        };

        let handler = ReferencesHandler::new(self.snapshot());
        let locations = handler.find_references(
            uri,
            &text,
            position,
            params.context.include_declaration,
        );
        if locations.is_empty() {
            return Ok(None);
        }
        Ok(Some(locations))
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = &params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;

        let Some(text) = self.document_text(uri).await else {
            return Ok(None);
        };

        let handler = CompletionHandler::new(self.snapshot());
        let items = handler.complete(uri, &text, position);
        if items.is_empty() {
            return Ok(None);
        }
        Ok(Some(CompletionResponse::Array(items)))
    }
}
