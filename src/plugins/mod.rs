pub mod telegram;

use futures::future;

use crate::{prelude::*, state::AppState};

#[async_trait::async_trait]
pub trait Plugin: Send + Sync {
  fn name(&self) -> &'static str {
    std::any::type_name::<Self>()
  }

  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()>;
}

pub struct App {
  plugins: Vec<Box<dyn Plugin>>,
}

impl App {
  pub fn new() -> Self {
    Self { plugins: Vec::new() }
  }

  pub fn register<P: Plugin + 'static>(mut self, plugin: P) -> Self {
    self.plugins.push(Box::new(plugin));
    self
  }

  /// Start every plugin and wait until all of them stop.
  pub async fn run(self, app: Arc<AppState>) {
    let runs = self.plugins.iter().map(|plugin| {
      let app = app.clone();
      async move {
        let name = plugin.name();
        info!("init `{}`", name);

        match plugin.start(app).await {
          Ok(()) => info!("stopped `{}`", name),
          Err(err) => error!("failed `{}`: {err:#}", name),
        }
      }
    });

    future::join_all(runs).await;
  }
}
