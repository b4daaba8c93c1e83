pub mod pool;
pub mod repos;

// Re-export commonly used items
pub use pool::{create_pool, run_migrations};
pub use repos::expense::{ExpenseRepo, ExpenseRow, NewExpense};
pub use repos::habit::{HabitCompletionRepo, HabitCompletionRow, HabitRepo, HabitRow};
pub use repos::refresh_token::{RefreshTokenRepo, RefreshTokenRow};
pub use repos::user::{UserRepo, UserRow};
pub use repos::user_auth_link::{UserAuthLinkRepo, UserAuthLinkRow};
