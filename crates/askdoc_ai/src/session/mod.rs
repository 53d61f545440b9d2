use std::fs;
use std::path::Path;

use askdoc_core::config::{AppConfig, DataDir, DEFAULT_SYSTEM_MESSAGE};
use askdoc_core::domain::Conversation;
use askdoc_core::error::AppError;
use askdoc_core::ingest::{import_document, DocumentKind, UploadSummary, DEFAULT_CHUNK_MAX_CHARS};
use askdoc_core::vault::VaultStore;
use tracing::{info, warn};

use crate::chat::{ChatOrchestrator, ChatReply, ChatSettings};
use crate::embeddings::{CachedEmbedder, Embedder, EmbeddingCache, OllamaEmbedder};
use crate::llm::{Llm, OllamaLlm};
use crate::ollama::OllamaClient;
use crate::retrieve::Corpus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub chat: ChatSettings,
    pub system_message: String,
    pub chunk_max_chars: usize,
    pub embed_concurrency: usize,
    pub cache_embeddings: bool,
}

impl SessionSettings {
    pub fn new(chat: ChatSettings) -> Self {
        Self {
            chat,
            system_message: DEFAULT_SYSTEM_MESSAGE.to_string(),
            chunk_max_chars: DEFAULT_CHUNK_MAX_CHARS,
            embed_concurrency: 1,
            cache_embeddings: false,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            chat: ChatSettings::from_config(config),
            system_message: config.system_message.clone(),
            chunk_max_chars: config.chunk_max_chars,
            embed_concurrency: config.embed_concurrency,
            cache_embeddings: config.cache_embeddings,
        }
    }
}

/// One user's chat session: the conversation so far plus the corpus snapshot it
/// answers against.
///
/// The snapshot is taken on the first query (or an explicit [`ChatSession::load`]) and
/// is not refreshed by uploads; they take effect on the next load. `clear` drops the
/// conversation, the snapshot and any cached vectors but never the vault file.
pub struct ChatSession {
    vault: VaultStore,
    embedder: Box<dyn Embedder>,
    llm: Box<dyn Llm>,
    settings: SessionSettings,
    conversation: Conversation,
    corpus: Option<Corpus>,
    cache: Option<EmbeddingCache>,
}

impl ChatSession {
    pub fn new(
        vault: VaultStore,
        embedder: Box<dyn Embedder>,
        llm: Box<dyn Llm>,
        settings: SessionSettings,
    ) -> Self {
        let cache = settings.cache_embeddings.then(EmbeddingCache::new);
        Self {
            vault,
            embedder,
            llm,
            settings,
            conversation: Conversation::new(),
            corpus: None,
            cache,
        }
    }

    /// Session wired to the vault under `data_dir` and an Ollama server from `config`.
    pub fn from_config(config: &AppConfig, data_dir: &DataDir) -> Result<Self, AppError> {
        let client = OllamaClient::from_config(config)?;
        Ok(Self::new(
            VaultStore::open(data_dir.vault_file()),
            Box::new(OllamaEmbedder::new(client.clone())),
            Box::new(OllamaLlm::new(client)),
            SessionSettings::from_config(config),
        ))
    }

    pub fn vault(&self) -> &VaultStore {
        &self.vault
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn cache(&self) -> Option<&EmbeddingCache> {
        self.cache.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.corpus.is_some()
    }

    /// Re-read the vault and embed every chunk, replacing the current snapshot.
    pub fn load(&mut self) -> Result<&Corpus, AppError> {
        let chunks = self.vault.read_all()?;
        if chunks.is_empty() {
            warn!(
                vault = %self.vault.path().display(),
                "vault is empty; upload a document first"
            );
        }

        let model = self.settings.chat.embed_model.as_str();
        let concurrency = self.settings.embed_concurrency;
        let corpus = match self.cache.as_ref() {
            Some(cache) => {
                let cached = CachedEmbedder::new(self.embedder.as_ref(), cache);
                Corpus::embed(chunks, &cached, model, concurrency)?
            }
            None => Corpus::embed(chunks, self.embedder.as_ref(), model, concurrency)?,
        };
        Ok(&*self.corpus.insert(corpus))
    }

    /// Current snapshot, loading it on first use.
    pub fn corpus(&mut self) -> Result<&Corpus, AppError> {
        if self.corpus.is_none() {
            return self.load();
        }
        self.corpus
            .as_ref()
            .ok_or_else(|| AppError::new("AI_CORPUS_NOT_LOADED", "Corpus is not loaded"))
    }

    /// Answer `query` against the snapshot and record the exchange.
    ///
    /// The conversation only grows when the whole answer succeeded.
    pub fn ask(&mut self, query: &str) -> Result<ChatReply, AppError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::invalid_argument("Query must not be empty"));
        }
        if self.corpus.is_none() {
            self.load()?;
        }
        let corpus = self
            .corpus
            .as_ref()
            .ok_or_else(|| AppError::new("AI_CORPUS_NOT_LOADED", "Corpus is not loaded"))?;

        let orchestrator = ChatOrchestrator::new(
            self.embedder.as_ref(),
            self.llm.as_ref(),
            self.settings.chat.clone(),
        );
        let reply = orchestrator.answer_with_sources(
            query,
            &self.settings.system_message,
            corpus,
            self.conversation.turns(),
        )?;

        self.conversation.push_exchange(query, reply.text.clone());
        Ok(reply)
    }

    /// Parse and append an upload. The loaded snapshot is left as is.
    pub fn upload(&self, bytes: &[u8], declared_type: &str) -> Result<UploadSummary, AppError> {
        import_document(
            &self.vault,
            bytes,
            declared_type,
            self.settings.chunk_max_chars,
        )
    }

    /// Upload a file from disk; the declared type defaults to one derived from the
    /// file extension.
    pub fn upload_file(
        &self,
        path: &Path,
        declared_type: Option<&str>,
    ) -> Result<UploadSummary, AppError> {
        let declared = declared_type
            .map(str::to_string)
            .unwrap_or_else(|| DocumentKind::declared_type_for_path(path));
        // Reject unsupported types before touching the file.
        DocumentKind::from_declared_type(&declared)?;

        let bytes = fs::read(path).map_err(|e| {
            AppError::new("UPLOAD_READ_FAILED", "Failed to read upload")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;
        let summary = self.upload(&bytes, &declared)?;
        info!(
            path = %path.display(),
            chunks = summary.chunk_count,
            "uploaded document"
        );
        Ok(summary)
    }

    /// Forget the conversation and cached embeddings. The vault is untouched.
    pub fn clear(&mut self) {
        self.conversation.clear();
        self.corpus = None;
        if let Some(cache) = self.cache.as_ref() {
            cache.clear();
        }
        info!("cleared session state");
    }
}
