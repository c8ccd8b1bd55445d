use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use serde_json::{json, Map, Value};
use tokio::{
    sync::oneshot::{self, Receiver, Sender},
    task::JoinHandle,
};
use tracing::{info, info_span, span::EnteredSpan};
use tracing_forest::{processor::from_fn, traits::*, tree::Tree, worker_task};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter, Layer, Registry};
use uuid::Uuid;

#[allow(dead_code)]
struct LogGlobal {
    handle: JoinHandle<()>,
}

lazy_static! {
    static ref SPAN_MAP: Mutex<HashMap<uuid::Uuid, Sender<Tree>>> = Mutex::new(HashMap::new());
    static ref LOG_GLOBAL: Mutex<Option<LogGlobal>> = Mutex::new(None);
}

/// Mechanism for creating a logging span that, using tracing-forest, will
/// aggregate a hierarchy of everything that was nested under the span, as
/// long as any futures run on its behalf were `.instrument()`ed.
///
/// `init_logging()` must have been called to install tracing-forest as the
/// subscriber, otherwise the tree never arrives.
pub struct LoggedSpan {
    span: EnteredSpan,
    rx: Receiver<Tree>,
}

pub fn render_forest_to_value(tree: &Tree) -> Value {
    match tree {
        Tree::Span(span) => {
            json!({
                "name": span.name(),
                "nodes": span.nodes().iter().map(render_forest_to_value).collect::<Vec<Value>>(),
            })
        }
        Tree::Event(event) => {
            let mut obj = Map::new();
            if let Some(msg) = event.message() {
                obj.insert("message".to_string(), json!(msg));
            }
            for field in event.fields() {
                obj.insert(field.key().to_string(), json!(field.value()));
            }
            json!(obj)
        }
    }
}

impl LoggedSpan {
    pub fn new_logged_span(name: &str) -> LoggedSpan {
        let id = Uuid::new_v4();

        let span = info_span!(parent: None, "logged_span", name, uuid = %id).entered();
        info!("logged_span_start");
        let (tx, rx) = oneshot::channel();

        SPAN_MAP
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, tx);

        LoggedSpan { span, rx }
    }

    /// Close the span and wait for its tree.  `None` if logging was never
    /// initialized or the worker went away.
    pub async fn retrieve(self) -> Option<Tree> {
        info!("logged_span_end");
        drop(self.span);
        self.rx.await.ok()
    }

    pub async fn retrieve_serde_json(self) -> Value {
        match self.retrieve().await {
            Some(tree) => render_forest_to_value(&tree),
            None => Value::Null,
        }
    }
}

/// Initialize logging.  Everything under `webreduce` is always captured at
/// trace level for the `LoggedSpan` mechanism, and if the environment
/// variable `RUST_LOG` is set to a non-empty value we additionally log to
/// stderr as it directs.
///
/// Must be called from within a tokio runtime.
pub fn init_logging() {
    {
        let global_opt = LOG_GLOBAL.lock().unwrap_or_else(PoisonError::into_inner);
        if global_opt.is_some() {
            return;
        }
    }

    let mut layers = Vec::new();
    // An empty RUST_LOG means "no opinion", not "log nothing".
    if let Ok(rustlog) = std::env::var("RUST_LOG") {
        if !rustlog.is_empty() {
            if let Ok(env_filter) = EnvFilter::try_from_default_env() {
                let layer = tracing_subscriber::fmt::layer()
                    .with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
                    .compact()
                    .with_ansi(false)
                    .without_time()
                    .with_writer(std::io::stderr)
                    .with_filter(env_filter)
                    .boxed();
                layers.push(layer);
            }
        }
    }

    let handle = tokio::spawn(
        worker_task()
            .set_global(true)
            .map_receiver(|_| {
                // For every tree we receive, see if it has a UUID that we're
                // looking for, and if so, hand it to whoever is waiting.
                from_fn(|tree| {
                    if let Tree::Span(span) = &tree {
                        let mut span_map = SPAN_MAP.lock().unwrap_or_else(PoisonError::into_inner);
                        if let Some(tx) = span_map.remove(&span.uuid()) {
                            // The receiver may have given up; that's fine.
                            let _ = tx.send(tree);
                        }
                    }
                    Ok(())
                })
            })
            .build_with(|layer| {
                layers.push(layer.boxed());
                Registry::default()
                    .with(layers)
                    .with(EnvFilter::new("webreduce=trace"))
            })
            .on(async {
                let _ = tokio::signal::ctrl_c().await;
            }),
    );

    let mut global_opt = LOG_GLOBAL.lock().unwrap_or_else(PoisonError::into_inner);
    *global_opt = Some(LogGlobal { handle });
}
