//! Batch generation: numbered orders or freeform dialogs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use synth_ai::EmbeddingProvider;

use crate::{
    analysis::AnalysisLog,
    cashier::{CashierAgent, CashierConfig},
    client::ClientAgent,
    dialog::{DialogOptions, DialogOutcome, write_dialog},
    error::Result,
    events::BatchEvent,
    knowledge::{KnowledgeConfig, MenuKnowledgeBase},
    menu::Menu,
    order::OrderSource,
    profile::Profile,
    transport::{RunConfig, Transport},
};

/// Which dialogs to generate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPlan {
    /// One dialog per order file, `start..=end`
    Numbered { start: u32, end: u32 },
    /// `count` freeform dialogs
    Random { count: u32 },
}

#[derive(Debug, Clone)]
pub struct BatchPaths {
    pub orders_dir: PathBuf,
    pub results_dir: PathBuf,
}

impl BatchPaths {
    pub fn order_file(&self, order: u32) -> PathBuf {
        self.orders_dir.join(format!("Order-{:04}.csv", order))
    }

    pub fn dialog_file(&self, order: u32) -> PathBuf {
        self.results_dir.join(format!("Dialog-{:04}.txt", order))
    }

    pub fn random_dialog_file(&self, index: u32) -> PathBuf {
        self.results_dir.join(format!("RandomDialog-{:04}.txt", index))
    }
}

/// Per-dialog agent settings
#[derive(Debug, Clone)]
pub struct DialogSettings {
    pub client: RunConfig,
    pub cashier: CashierConfig,
    pub knowledge: KnowledgeConfig,
    pub dialog: DialogOptions,
    /// Fixed customer profile; `None` picks one at random per dialog
    pub profile: Option<Profile>,
}

/// Builds a fresh client/cashier pair for every dialog
pub struct DialogFactory {
    menu: Arc<Menu>,
    transport: Arc<dyn Transport>,
    embedder: Arc<dyn EmbeddingProvider>,
    settings: DialogSettings,
    rng: StdRng,
}

impl DialogFactory {
    pub fn new(
        menu: Arc<Menu>,
        transport: Arc<dyn Transport>,
        embedder: Arc<dyn EmbeddingProvider>,
        settings: DialogSettings,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            menu,
            transport,
            embedder,
            settings,
            rng,
        }
    }

    pub fn settings(&self) -> &DialogSettings {
        &self.settings
    }

    /// Generate one dialog into `output`. The knowledge base is rebuilt
    /// every time.
    pub async fn generate(&mut self, order: OrderSource, output: &Path) -> Result<DialogOutcome> {
        let profile = self
            .settings
            .profile
            .unwrap_or_else(|| Profile::random(&mut self.rng));
        let client_rng = StdRng::seed_from_u64(self.rng.next_u64());

        let knowledge = MenuKnowledgeBase::build(
            &self.menu,
            self.embedder.clone(),
            &self.settings.knowledge,
        )
        .await?;

        let mut client = ClientAgent::new(
            profile,
            order,
            self.transport.clone(),
            self.settings.client.clone(),
            client_rng,
        );
        let mut cashier = CashierAgent::new(
            &self.menu,
            Box::new(knowledge),
            self.transport.clone(),
            self.settings.cashier.clone(),
        );

        tracing::info!(profile = %profile, path = %output.display(), "Generating dialog");
        write_dialog(&mut client, &mut cashier, output, &self.settings.dialog).await
    }
}

/// Counts for a finished batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub completed: u32,
    pub skipped: u32,
    pub failed: u32,
}

pub struct BatchRunner {
    factory: DialogFactory,
    paths: BatchPaths,
    analysis: AnalysisLog,
}

impl BatchRunner {
    pub fn new(factory: DialogFactory, paths: BatchPaths, analysis: AnalysisLog) -> Self {
        Self {
            factory,
            paths,
            analysis,
        }
    }

    pub fn paths(&self) -> &BatchPaths {
        &self.paths
    }

    /// Run the plan, reporting progress through `on_event`. In numbered
    /// mode a failing order is reported and skipped; in random mode the
    /// first error ends the batch.
    pub async fn run(
        &mut self,
        plan: BatchPlan,
        mut on_event: impl FnMut(BatchEvent),
    ) -> Result<BatchSummary> {
        std::fs::create_dir_all(&self.paths.results_dir)?;
        let mut summary = BatchSummary::default();

        match plan {
            BatchPlan::Numbered { start, end } => {
                for order in start..=end {
                    let order_path = self.paths.order_file(order);
                    if !order_path.exists() {
                        tracing::debug!(path = %order_path.display(), "Order file not found");
                        summary.skipped += 1;
                        on_event(BatchEvent::OrderMissing {
                            order,
                            path: order_path,
                        });
                        continue;
                    }

                    let output = self.paths.dialog_file(order);
                    match self.numbered_dialog(&order_path, &output).await {
                        Ok(outcome) => {
                            summary.completed += 1;
                            on_event(BatchEvent::DialogWritten {
                                order,
                                path: output,
                                stats: outcome.stats,
                            });
                        }
                        Err(e) => {
                            tracing::error!(path = %order_path.display(), "Dialog failed: {}", e);
                            summary.failed += 1;
                            on_event(BatchEvent::OrderFailed {
                                order,
                                path: order_path,
                                error: e.to_string(),
                            });
                        }
                    }
                }
            }
            BatchPlan::Random { count } => {
                for index in 0..count {
                    let output = self.paths.random_dialog_file(index);
                    let outcome = self.factory.generate(OrderSource::Freeform, &output).await?;
                    self.analysis.record(&outcome.stats)?;
                    summary.completed += 1;
                    on_event(BatchEvent::RandomDialogWritten {
                        index,
                        path: output,
                        stats: outcome.stats,
                    });
                }
            }
        }

        tracing::info!(
            completed = summary.completed,
            skipped = summary.skipped,
            failed = summary.failed,
            "Batch finished"
        );
        Ok(summary)
    }

    async fn numbered_dialog(&mut self, order_path: &Path, output: &Path) -> Result<DialogOutcome> {
        let source = OrderSource::from_path(Some(order_path))?;
        let outcome = self.factory.generate(source, output).await?;
        self.analysis.record(&outcome.stats)?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::HEADER;
    use crate::menu::tests::small_menu;
    use crate::transport::tests::{MockTransport, test_model};
    use synth_ai::HashingEmbedder;

    fn settings(profile: Option<Profile>) -> DialogSettings {
        DialogSettings {
            client: RunConfig::new(test_model()).with_temperature(0.4),
            cashier: CashierConfig::new(RunConfig::new(test_model()).with_temperature(0.0)),
            knowledge: KnowledgeConfig::default(),
            dialog: DialogOptions::default(),
            profile,
        }
    }

    fn runner(root: &Path, transport: Arc<dyn Transport>) -> BatchRunner {
        let factory = DialogFactory::new(
            Arc::new(small_menu()),
            transport,
            Arc::new(HashingEmbedder::new(64)),
            settings(Some(Profile::Regular)),
            Some(1),
        );
        let paths = BatchPaths {
            orders_dir: root.join("Orders"),
            results_dir: root.join("results"),
        };
        let analysis = AnalysisLog::open(root.join("analysis.csv")).unwrap();
        BatchRunner::new(factory, paths, analysis)
    }

    #[test]
    fn test_paths() {
        let paths = BatchPaths {
            orders_dir: "Orders".into(),
            results_dir: "results".into(),
        };
        assert_eq!(paths.order_file(3), Path::new("Orders/Order-0003.csv"));
        assert_eq!(paths.dialog_file(12), Path::new("results/Dialog-0012.txt"));
        assert_eq!(
            paths.random_dialog_file(0),
            Path::new("results/RandomDialog-0000.txt")
        );
    }

    #[tokio::test]
    async fn test_numbered_batch_skips_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        let orders = dir.path().join("Orders");
        std::fs::create_dir_all(&orders).unwrap();
        std::fs::write(orders.join("Order-0001.csv"), "Item;Quantity\nBurger;2\n").unwrap();
        std::fs::write(orders.join("Order-0003.csv"), "Item;Count\nBurger;2\n").unwrap();

        let transport = Arc::new(MockTransport::always("Enjoy the meal, bye!"));
        let mut runner = runner(dir.path(), transport);

        let mut events = vec![];
        let summary = runner
            .run(BatchPlan::Numbered { start: 1, end: 3 }, |e| events.push(e))
            .await
            .unwrap();

        assert_eq!(
            summary,
            BatchSummary {
                completed: 1,
                skipped: 1,
                failed: 1
            }
        );
        assert!(matches!(events[0], BatchEvent::DialogWritten { order: 1, .. }));
        assert!(matches!(events[1], BatchEvent::OrderMissing { order: 2, .. }));
        match &events[2] {
            BatchEvent::OrderFailed { order, error, .. } => {
                assert_eq!(*order, 3);
                assert!(error.contains("missing column: Quantity"));
            }
            other => panic!("unexpected event: {other:?}"),
        }

        let dialog = std::fs::read_to_string(dir.path().join("results/Dialog-0001.txt")).unwrap();
        assert_eq!(dialog, "Client: Enjoy the meal, bye!\nCashier: Enjoy the meal, bye!\n");

        let analysis = std::fs::read_to_string(dir.path().join("analysis.csv")).unwrap();
        let lines: Vec<_> = analysis.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], HEADER);
        assert!(lines[1].starts_with("0001;"));
    }

    #[tokio::test]
    async fn test_random_batch() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(MockTransport::always("Bye"));
        let mut runner = runner(dir.path(), transport);

        let mut written = vec![];
        let summary = runner
            .run(BatchPlan::Random { count: 2 }, |e| {
                if let BatchEvent::RandomDialogWritten { path, .. } = e {
                    written.push(path);
                }
            })
            .await
            .unwrap();

        assert_eq!(summary.completed, 2);
        assert_eq!(
            written,
            vec![
                dir.path().join("results/RandomDialog-0000.txt"),
                dir.path().join("results/RandomDialog-0001.txt"),
            ]
        );
        let analysis = std::fs::read_to_string(dir.path().join("analysis.csv")).unwrap();
        assert!(analysis.lines().nth(2).unwrap().starts_with("0001;"));
    }

    #[tokio::test]
    async fn test_random_batch_aborts_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(MockTransport::always(""));
        let mut runner = runner(dir.path(), transport);

        let result = runner.run(BatchPlan::Random { count: 3 }, |_| {}).await;
        assert!(matches!(result, Err(crate::Error::EmptyResponse)));
    }

    #[tokio::test]
    async fn test_factory_picks_profile_when_unset() {
        let dir = tempfile::tempdir().unwrap();
        let mut factory = DialogFactory::new(
            Arc::new(small_menu()),
            Arc::new(MockTransport::always("Goodbye")),
            Arc::new(HashingEmbedder::new(32)),
            settings(None),
            Some(3),
        );
        let output = dir.path().join("RandomDialog-0009.txt");
        let outcome = factory.generate(OrderSource::Freeform, &output).await.unwrap();
        assert_eq!(outcome.stats.order_id, Some(9));
        assert_eq!(outcome.transcript.len(), 2);
    }
}
