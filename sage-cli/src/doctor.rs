use sage_rag::{GeminiGenerationProvider, GenerationProvider, GenerationRequest, VectorStore};

use crate::cli::GlobalArgs;
use crate::settings::{FALLBACK_API_KEY_ENV, Settings, resolve_api_key};

/// Port Qdrant serves REST on; the gRPC client needs 6334.
const QDRANT_REST_PORT: &str = ":6333";

/// Show a value with surrounding whitespace made visible.
pub fn quote_raw(value: &str) -> String {
    format!("{value:?}")
}

/// A warning when the URL points at Qdrant's REST port.
pub fn port_warning(url: &str) -> Option<String> {
    let url = url.trim().trim_end_matches('/');
    url.ends_with(QDRANT_REST_PORT).then(|| {
        format!("{url} uses the REST port 6333; the gRPC client expects 6334")
    })
}

struct Report {
    failures: usize,
}

impl Report {
    fn pass(&self, check: &str, detail: impl std::fmt::Display) {
        println!("[ ok ] {check}: {detail}");
    }

    fn fail(&mut self, check: &str, detail: impl std::fmt::Display) {
        println!("[fail] {check}: {detail}");
        self.failures += 1;
    }

    fn note(&self, detail: impl std::fmt::Display) {
        println!("       {detail}");
    }
}

/// Run every check and report each one. Returns whether all passed.
pub async fn run(args: &GlobalArgs) -> bool {
    let mut report = Report { failures: 0 };

    println!("Configuration");
    let fallback = std::env::var(FALLBACK_API_KEY_ENV).ok();
    match resolve_api_key(args.google_api_key.as_deref(), fallback.as_deref()) {
        Ok(key) => report.pass("api key", format!("set ({} chars)", key.len())),
        Err(e) => report.fail("api key", e),
    }
    if let Some(url) = args.qdrant_url.as_deref() {
        report.note(format!("QDRANT_URL = {}", quote_raw(url)));
        if let Some(warning) = port_warning(url) {
            report.note(warning);
        }
    }
    report.note(format!("local path = {}", args.local_path.display()));
    report.note(format!("collection = {}", quote_raw(&args.collection)));

    let settings = match Settings::from_args(args) {
        Ok(settings) => settings,
        Err(e) => {
            report.fail("settings", e);
            return false;
        }
    };

    println!("\nGemini");
    match GeminiGenerationProvider::new(&settings.google_api_key) {
        Ok(generator) => {
            let request = GenerationRequest {
                system_instruction: String::new(),
                user_message: "Hello".to_string(),
                temperature: 0.0,
            };
            match generator.generate(&request).await {
                Ok(reply) => report.pass("generation", format!("replied with {} chars", reply.len())),
                Err(e) => report.fail("generation", e),
            }
        }
        Err(e) => report.fail("generation", e),
    }

    println!("\nVector store");
    match settings.store.connect().await {
        Ok(store) => {
            report.pass("connect", &settings.store);
            check_store(store.as_ref(), &settings.collection, &mut report).await;
        }
        Err(e) => report.fail("connect", e),
    }

    println!();
    if report.failures == 0 {
        println!("All checks passed.");
    } else {
        println!("{} check(s) failed.", report.failures);
    }
    report.failures == 0
}

async fn check_store(store: &dyn VectorStore, collection: &str, report: &mut Report) {
    match store.list_collections().await {
        Ok(names) => report.pass("collections", format!("{names:?}")),
        Err(e) => {
            report.fail("collections", e);
            return;
        }
    }
    match store.collection_exists(collection).await {
        Ok(true) => report.pass("knowledge base", format!("'{collection}' exists")),
        Ok(false) => report.fail(
            "knowledge base",
            format!("'{collection}' not found; run `sage ingest` first"),
        ),
        Err(e) => report.fail("knowledge base", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_raw_shows_whitespace() {
        assert_eq!(quote_raw(" http://x:6334\n"), "\" http://x:6334\\n\"");
    }
}
