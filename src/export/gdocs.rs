//! Google Docs export over the REST API.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context};
use chrono::Local;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::sections::footer_lines;
use crate::material::{Material, MaterialBody};
use crate::textutil::log_preview;

pub const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";
const DOCS_API: &str = "https://docs.googleapis.com/v1/documents";

pub const SETUP_INSTRUCTIONS: &str = "\
Google Docs API の設定手順:
1. Google Cloud Console (https://console.cloud.google.com/) でプロジェクトを作成
2. 「APIとサービス」から Google Docs API を有効化
3. 「認証情報」で OAuth クライアントを作成し、アクセストークンを取得
4. トークンを JSON ファイル ({\"access_token\": \"...\"}) として保存
5. 環境変数 GOOGLE_APPLICATION_CREDENTIALS にそのファイルのパスを設定
   (または設定ファイルの [export] google_credentials に記載)
未設定の場合は export --format docx でローカルの Word 文書を作成できます。";

/// Remote document sink. Unavailability is reported, never raised.
pub trait DocumentExporter {
    fn is_available(&self) -> bool;

    /// Create one document and return its URL. `Ok(None)` when unavailable.
    fn create_and_write_material(&mut self, title: &str, material: &Material) -> anyhow::Result<Option<String>>;

    fn setup_instructions(&self) -> &str {
        SETUP_INSTRUCTIONS
    }
}

#[derive(Debug, Deserialize)]
struct CredentialsFile {
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedDocument {
    document_id: String,
}

pub const DEFAULT_AUTHOR: &str = "語学教材作成支援ツール";

pub struct GoogleDocsClient {
    http: Option<Client>,
    token: Option<String>,
    author: String,
}

impl GoogleDocsClient {
    /// Read an OAuth token JSON from `path`, or from `GOOGLE_APPLICATION_CREDENTIALS`.
    /// Missing or unusable credentials yield an unavailable client.
    pub fn from_credentials(path: Option<&Path>, timeout: Duration) -> Self {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CREDENTIALS_ENV).map(PathBuf::from));
        let token = path.as_deref().and_then(|p| match read_token(p) {
            Ok(t) => t,
            Err(err) => {
                log::warn!("google credentials unusable: {err:#}");
                None
            }
        });
        let http = token.as_ref().and_then(|_| {
            Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|err| log::warn!("build HTTP client: {err}"))
                .ok()
        });
        Self {
            http,
            token,
            author: DEFAULT_AUTHOR.to_string(),
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    fn authed(&self) -> Option<(&Client, &str)> {
        Some((self.http.as_ref()?, self.token.as_deref()?))
    }
}

fn read_token(path: &Path) -> anyhow::Result<Option<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read credentials: {}", path.display()))?;
    let creds: CredentialsFile = serde_json::from_str(&text).context("parse credentials json")?;
    let token = creds.access_token.or(creds.token).filter(|t| !t.trim().is_empty());
    if token.is_none() {
        if creds.kind.as_deref() == Some("service_account") {
            log::warn!("service-account keys need a token exchange; supply an OAuth access token instead");
        } else {
            log::warn!("credentials file has no access_token: {}", path.display());
        }
    }
    Ok(token)
}

impl DocumentExporter for GoogleDocsClient {
    fn is_available(&self) -> bool {
        self.authed().is_some()
    }

    fn create_and_write_material(&mut self, title: &str, material: &Material) -> anyhow::Result<Option<String>> {
        let Some((http, token)) = self.authed() else {
            return Ok(None);
        };

        let resp = http
            .post(DOCS_API)
            .bearer_auth(token)
            .json(&json!({ "title": title }))
            .send()
            .context("send create document request")?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            return Err(anyhow!("documents.create returned {status}: {}", log_preview(&text, 200)));
        }
        let created: CreatedDocument = resp.json().context("decode create document response")?;
        log::debug!("created document {}", created.document_id);

        let body = batch_update_body(&document_blocks(material, &self.author));
        let resp = http
            .post(format!("{DOCS_API}/{}:batchUpdate", created.document_id))
            .bearer_auth(token)
            .json(&body)
            .send()
            .context("send batchUpdate request")?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            return Err(anyhow!("documents.batchUpdate returned {status}: {}", log_preview(&text, 200)));
        }
        Ok(Some(document_url(&created.document_id)))
    }
}

pub fn document_url(id: &str) -> String {
    format!("https://docs.google.com/document/d/{id}/edit")
}

pub fn document_title(material: &Material, ts: &str, number: usize) -> String {
    format!("教材_{ts}_{number}_{}", material.topic)
}

fn block(heading: &str, lines: Vec<String>) -> Option<String> {
    if lines.iter().all(|l| l.trim().is_empty()) {
        return None;
    }
    Some(format!("\n{heading}\n{}\n", lines.join("\n")))
}

fn numbered(items: &[String]) -> Vec<String> {
    items.iter().enumerate().map(|(i, s)| format!("{}. {s}", i + 1)).collect()
}

/// Text blocks inserted in order; each starts with its heading line.
pub fn document_blocks(material: &Material, author: &str) -> Vec<String> {
    let mut out = vec![format!("📚 語学教材: {}\n\nトピック: {}\n", material.kind().label_ja(), material.topic)];
    let mut push = |b: Option<String>| out.extend(b);
    match &material.body {
        MaterialBody::RolePlay(b) => {
            push(block("💬 モデルダイアログ", vec![b.model_dialogue.trim().to_string()]));
            push(block("📝 有用表現・語彙", numbered(&material.useful_expressions)));
            push(block("❓ 追加質問", numbered(&b.additional_questions)));
        }
        MaterialBody::Discussion(b) => {
            push(block(
                "💭 ディスカッショントピック",
                vec![b.discussion_topic.clone(), String::new(), b.background_info.clone()],
            ));
            push(block("📝 有用表現・語彙", numbered(&material.useful_expressions)));
            push(block("❓ 追加質問", numbered(&b.discussion_questions)));
        }
        MaterialBody::ExpressionPractice(b) => {
            push(block("📊 図表・データ説明", vec![b.chart_description.trim().to_string()]));
            push(block("📝 有用表現・語彙", numbered(&b.useful_vocabulary)));
            push(block("❓ 追加質問", numbered(&b.practice_questions)));
        }
    }
    let footer = footer_lines(author, Local::now());
    out.push(format!("\n---\n{}\n", footer.join("\n")));
    out
}

/// `insertText` requests for a fresh document. The body starts at index 1 and
/// indexes count UTF-16 code units.
pub fn batch_update_body(blocks: &[String]) -> Value {
    let mut index = 1usize;
    let mut requests = Vec::with_capacity(blocks.len());
    for text in blocks {
        requests.push(json!({
            "insertText": { "location": { "index": index }, "text": text }
        }));
        index += text.encode_utf16().count();
    }
    json!({ "requests": requests })
}
