use anyhow::Result;
use clap::{Parser, Subcommand};
use spendwise_client::api::{parse_day, ApiClient};
use spendwise_client::config::load_or_default;
use spendwise_client::session::{SessionManager, SessionState};
use spendwise_client::store::{
    FallbackTokenStore, FileTokenStore, MemoryTokenStore, SessionTokens, TokenStore,
};
use spendwise_common::analytics::display_percent;
use spendwise_common::models::auth::AuthProvider;
use spendwise_common::models::expense::ExpenseInput;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "spendwise", version, about = "Spendwise CLI - expenses, habits and budget insights")]
struct Cli {
    /// Server URL
    #[arg(long, env = "SPENDWISE_URL")]
    server: Option<String>,

    /// Client config file (default: <config dir>/spendwise/client.yaml)
    #[arg(long, env = "SPENDWISE_CLIENT_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and log in
    Register {
        email: String,
        #[arg(long, env = "SPENDWISE_PASSWORD")]
        password: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// Log in with email and password
    Login {
        email: String,
        #[arg(long, env = "SPENDWISE_PASSWORD")]
        password: String,
    },
    /// Log in with a Google or Apple identity token
    SocialLogin {
        /// google or apple
        provider: AuthProvider,
        id_token: String,
    },
    /// Log out and forget the saved session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Show or set the monthly budget
    Budget {
        /// New monthly budget
        amount: Option<f64>,
    },
    /// List expenses
    Expenses,
    /// Record an expense
    AddExpense {
        amount: f64,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        note: Option<String>,
        #[arg(long)]
        currency: Option<String>,
        /// Day spent (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Delete an expense
    DeleteExpense { id: Uuid },
    /// Spending by category for a month
    Breakdown {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        month: Option<u32>,
    },
    /// List habits with their streaks
    Habits,
    /// Create a habit
    AddHabit { title: String },
    /// Mark a habit done today
    Complete { id: Uuid },
    /// Undo today's completion
    Undo { id: Uuid },
    /// Habit completion stats
    Stats,
    /// Budget insight for this month
    Insights,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_or_default(cli.config.as_deref())?;
    let client = ApiClient::with_timeout(
        &config.server_url(cli.server.as_deref()),
        config.request_timeout(),
    )?;

    let file_store = match &config.token_file {
        Some(path) => FileTokenStore::new(path),
        None => FileTokenStore::default_location()?,
    };
    let store: Arc<dyn TokenStore> = Arc::new(FallbackTokenStore::new(
        Box::new(file_store),
        Box::new(MemoryTokenStore::new()),
    ));
    let session = SessionManager::start(Arc::new(client.clone()), store);
    let state = session.ready().await;

    match cli.command {
        Commands::Register {
            email,
            password,
            name,
        } => {
            let resp = client.register(&email, &password, name.as_deref()).await?;
            let user = session
                .login_with_token(SessionTokens {
                    access_token: resp.access_token,
                    refresh_token: Some(resp.refresh_token),
                })
                .await?;
            println!("Registered and logged in as {}", user.email);
        }
        Commands::Login { email, password } => {
            let user = session.login(&email, &password).await?;
            println!("Logged in as {}", user.email);
        }
        Commands::SocialLogin { provider, id_token } => {
            let resp = client.social_login(provider, &id_token).await?;
            let user = session
                .login_with_token(SessionTokens {
                    access_token: resp.access_token,
                    refresh_token: Some(resp.refresh_token),
                })
                .await?;
            println!("Logged in with {} as {}", provider, user.email);
        }
        Commands::Logout => {
            session.logout().await;
            println!("Logged out");
        }
        command => {
            require_login(&state)?;
            run_authenticated(&client, &state, command).await?;
        }
    }

    Ok(())
}

fn require_login(state: &SessionState) -> Result<()> {
    match state {
        SessionState::Authenticated(_) => Ok(()),
        _ => anyhow::bail!("Not logged in. Run `spendwise login <email>` first."),
    }
}

async fn run_authenticated(client: &ApiClient, state: &SessionState, command: Commands) -> Result<()> {
    match command {
        Commands::Whoami => {
            if let Some(user) = state.user() {
                println!("Email:    {}", user.email);
                println!("Name:     {}", user.name.as_deref().unwrap_or("-"));
                println!("Provider: {}", user.provider);
                match user.monthly_budget {
                    Some(b) => println!("Budget:   {:.2}", b),
                    None => println!("Budget:   -"),
                }
            }
        }
        Commands::Budget { amount: Some(amount) } => {
            client.set_monthly_budget(amount).await?;
            println!("Monthly budget set to {:.2}", amount);
        }
        Commands::Budget { amount: None } => match client.monthly_budget().await? {
            Some(b) => println!("Monthly budget: {:.2}", b),
            None => println!("No monthly budget set"),
        },
        Commands::Expenses => {
            let expenses = client.list_expenses().await?;
            if expenses.is_empty() {
                println!("No expenses");
            }
            for e in expenses {
                print!(
                    "{}  {}  {:>10.2} {}  {:12}",
                    e.expense_id, e.spent_on, e.amount, e.currency, e.category
                );
                if let Some(note) = &e.note {
                    print!("  {}", note);
                }
                println!();
            }
        }
        Commands::AddExpense {
            amount,
            category,
            note,
            currency,
            date,
        } => {
            let spent_on = date.as_deref().map(parse_day).transpose()?;
            let expense = client
                .create_expense(&ExpenseInput {
                    amount: Some(amount),
                    category,
                    note,
                    currency,
                    spent_on,
                })
                .await?;
            println!(
                "Added {:.2} {} ({}) on {}",
                expense.amount, expense.currency, expense.category, expense.spent_on
            );
        }
        Commands::DeleteExpense { id } => {
            client.delete_expense(id).await?;
            println!("Deleted expense {}", id);
        }
        Commands::Breakdown { year, month } => {
            let breakdown = client.breakdown(year, month).await?;
            println!(
                "{}-{:02}: total {:.2}",
                breakdown.year, breakdown.month, breakdown.month_total
            );
            for c in breakdown.categories {
                let bar = "#".repeat((display_percent(c.percent) / 4).max(1) as usize);
                println!("  {:12} {:>10.2} {:>4}% {}", c.category, c.amount, c.percent, bar);
            }
        }
        Commands::Habits => {
            let habits = client.list_habits().await?;
            if habits.is_empty() {
                println!("No habits");
            }
            for h in habits {
                let mark = if h.completed_today { "x" } else { " " };
                println!("[{}] {}  {:24} streak {}", mark, h.id, h.title, h.streak);
            }
        }
        Commands::AddHabit { title } => {
            let habit = client.create_habit(&title).await?;
            println!("Created habit {} ({})", habit.title, habit.id);
        }
        Commands::Complete { id } => {
            let habit = client.complete_habit(id).await?;
            println!("{}: streak {}", habit.title, habit.streak);
        }
        Commands::Undo { id } => {
            let habit = client.undo_habit(id).await?;
            println!("{}: streak {}", habit.title, habit.streak);
        }
        Commands::Stats => {
            let stats = client.habit_stats().await?;
            println!("Last 7 days:  {}", stats.weekly_completions);
            println!("Last 30 days: {}", stats.monthly_completions);
            for s in stats.longest_streaks {
                println!("  {}  longest streak {}", s.id, s.longest_streak);
            }
        }
        Commands::Insights => match client.insights().await? {
            None => println!("Set a monthly budget to see insights"),
            Some(insight) => {
                println!(
                    "{:?}: {}% of {:.2} used ({:.2} spent)",
                    insight.level,
                    insight.budget_used_percent,
                    insight.monthly_budget,
                    insight.current_spent
                );
                if let Some(message) = insight.message {
                    println!("{}", message);
                }
            }
        },
        Commands::Register { .. }
        | Commands::Login { .. }
        | Commands::SocialLogin { .. }
        | Commands::Logout => {
            anyhow::bail!("Handled before authentication")
        }
    }
    Ok(())
}
