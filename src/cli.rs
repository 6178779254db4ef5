use clap::Parser;

use crate::menu_planner::{MealType, StartDay};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Budget for the plan, in currency units
    #[arg(short, long)]
    pub budget: f64,

    /// Number of days to plan
    #[arg(short, long, default_value_t = 3)]
    pub days: u32,

    /// Which meals to plan
    #[arg(short, long, value_enum, default_value = "all")]
    pub meal: MealType,

    /// First day of the plan
    #[arg(short, long, value_enum, default_value = "today")]
    pub start: StartDay,

    /// User profile the menu history and shopping list are stored under
    #[arg(short, long, default_value = "default")]
    pub user: String,

    /// Directory for per-user data files
    #[arg(long, default_value = ".flash_menu")]
    pub data_dir: String,

    /// Comma-separated ingredients already on hand, added to the stored list
    #[arg(long)]
    pub have: Option<String>,

    /// Optional CSV file replacing the built-in price catalog
    #[arg(long)]
    pub catalog: Option<String>,
}

pub fn parse_args() -> Cli {
    Cli::parse()
}
