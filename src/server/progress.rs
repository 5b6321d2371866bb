use tower_lsp::lsp_types::notification::Progress as ProgressNotification;
use tower_lsp::lsp_types::request::WorkDoneProgressCreate;
use tower_lsp::lsp_types::*;
use tower_lsp::Client;

/// work done progress の通知をまとめたヘルパー
pub struct Progress<'a> {
    client: &'a Client,
    token: NumberOrString,
}

impl<'a> Progress<'a> {
    /// トークンを作成して開始を通知する
    pub async fn begin(client: &'a Client, token_name: &str, title: &str) -> Progress<'a> {
        let token = NumberOrString::String(token_name.to_string());
        // クライアントが対応していなくても通知は続ける
        let _ = client
            .send_request::<WorkDoneProgressCreate>(WorkDoneProgressCreateParams {
                token: token.clone(),
            })
            .await;

        let progress = Progress { client, token };
        progress
            .send(WorkDoneProgress::Begin(WorkDoneProgressBegin {
                title: title.to_string(),
                cancellable: Some(false),
                message: None,
                percentage: Some(0),
            }))
            .await;
        progress
    }

    pub async fn report(&self, message: impl Into<String>, percentage: u32) {
        self.send(WorkDoneProgress::Report(WorkDoneProgressReport {
            cancellable: Some(false),
            message: Some(message.into()),
            percentage: Some(percentage),
        }))
        .await;
    }

    pub async fn end(self, message: impl Into<String>) {
        self.send(WorkDoneProgress::End(WorkDoneProgressEnd {
            message: Some(message.into()),
        }))
        .await;
    }

    async fn send(&self, value: WorkDoneProgress) {
        self.client
            .send_notification::<ProgressNotification>(ProgressParams {
                token: self.token.clone(),
                value: ProgressParamsValue::WorkDone(value),
            })
            .await;
    }
}
