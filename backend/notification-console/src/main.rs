use anyhow::Context;
use fcm_receiver::{MessageReceiver, PushPayload, RegistrationListener};
use notification_console::{
    commands::{ParseError, HELP},
    Action, Alert, AlertPresenter, BackendKind, Command, Config, ConsolePresenter, Orchestrator,
    Settings, Slot, SlotStore, TaskOutcome,
};
use sns_shared::{
    memory::DEFAULT_PLATFORM_APPLICATION_ARN, EndpointId, InMemoryBackend, NotificationBackend,
    SnsClient,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

struct Console {
    orchestrator: Orchestrator,
    listener: RegistrationListener,
    receiver: MessageReceiver<ConsolePresenter>,
    presenter: ConsolePresenter,
    /// Set when running against the local backend, to feed deliveries back in
    memory: Option<Arc<InMemoryBackend>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    tracing::info!(backend = ?config.console.backend, "Starting notification console");

    let (backend, memory): (Arc<dyn NotificationBackend>, Option<Arc<InMemoryBackend>>) =
        match config.console.backend {
            BackendKind::Aws => {
                let client = SnsClient::new(&config.sns)
                    .await
                    .context("Failed to create SNS client")?;
                (Arc::new(client), None)
            }
            BackendKind::Memory => {
                let application_arn = if config.sns.platform_application_arn.is_empty() {
                    DEFAULT_PLATFORM_APPLICATION_ARN.to_string()
                } else {
                    config.sns.platform_application_arn.clone()
                };
                let memory = Arc::new(InMemoryBackend::new(application_arn));
                (memory.clone(), Some(memory))
            }
        };

    let store = SlotStore::open(&config.console.store_path).with_context(|| {
        format!(
            "Failed to open identifier store at {}",
            config.console.store_path.display()
        )
    })?;

    let (listener, tokens) = RegistrationListener::new();
    if let Some(token) = &config.console.device_token {
        listener.on_token_refresh(token.as_str());
    }

    let (orchestrator, mut outcomes) = Orchestrator::new(
        backend,
        Arc::new(store),
        tokens,
        Settings::from(&config.console),
    );

    let console = Console {
        orchestrator,
        listener,
        receiver: MessageReceiver::new(ConsolePresenter)
            .with_title(config.console.notification_title.as_str()),
        presenter: ConsolePresenter,
        memory,
    };

    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read from stdin")? else {
                    break;
                };
                match line.parse::<Command>() {
                    Ok(Command::Quit) => break,
                    Ok(command) => console.handle(command).await,
                    Err(ParseError::Empty) => {}
                    Err(e) => println!("{e}"),
                }
            }
            Some(outcome) = outcomes.recv() => {
                console.on_outcome(outcome).await;
            }
        }
    }

    tracing::info!("Notification console stopped");
    Ok(())
}

impl Console {
    async fn handle(&self, command: Command) {
        match command {
            Command::Run(action) => {
                if let Err(refusal) = self.orchestrator.dispatch(action.clone()).await {
                    self.presenter
                        .show_alert(&Alert::for_refusal(&action, &refusal));
                }
            }
            Command::Token(token) => {
                self.listener.on_token_refresh(token);
                println!("Registration token updated");
            }
            Command::Receive(json) => match PushPayload::from_json(&json) {
                Ok(payload) => {
                    if self.receiver.on_message_received(&payload).is_none() {
                        println!("Payload had nothing to display");
                    }
                }
                Err(e) => println!("{e}"),
            },
            Command::Status => self.print_status().await,
            Command::Help => println!("{HELP}"),
            Command::Quit => {}
        }
    }

    async fn on_outcome(&self, outcome: TaskOutcome) {
        self.presenter.show_alert(&Alert::for_outcome(&outcome));

        if outcome.action == Action::SendMessage && outcome.result.is_ok() {
            self.deliver_local_pushes().await;
        }
    }

    /// Hand pushes queued by the local backend to the message receiver
    async fn deliver_local_pushes(&self) {
        let Some(memory) = &self.memory else {
            return;
        };
        let Some(endpoint) = self.orchestrator.store().get(Slot::PlatformEndpoint).await else {
            return;
        };

        for data in memory.take_deliveries(&EndpointId::new(endpoint)) {
            self.receiver.on_message_received(&PushPayload::from(data));
        }
    }

    async fn print_status(&self) {
        for (slot, value) in self.orchestrator.store().snapshot().await {
            let state = if self.orchestrator.is_pending(slot) {
                "pending"
            } else if value.is_some() {
                "present"
            } else {
                "absent"
            };
            println!(
                "{:<18} {:<8} {}",
                slot.key(),
                state,
                value.as_deref().unwrap_or("-")
            );
        }
    }
}
