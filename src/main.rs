use anyhow::{bail, Context, Result};
use house_valuation::error::Error;
use house_valuation::features::{parse_yes_no, BhkOrRk, PostedBy, PropertyForm};
use house_valuation::{
    average_by_city, format_inr, history_rows, time_series, write_csv, AuthView, Config,
    CredentialStore, LinearModel, PredictionAuditLog, SessionController, Store,
    ValidationError, ValuationService,
};
use std::env;
use std::fs::File;
use std::io::{self, BufRead, Write};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> Result<()> {
    let config = Config::from_env()?;
    let filter = EnvFilter::try_new(&config.log_filter)
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() > 1 && args[1] == "init" {
        run_init(&config)?;
    } else {
        run_interactive(&config)?;
    }

    Ok(())
}

fn run_init(config: &Config) -> Result<()> {
    println!("🔧 Setting up database...");
    Store::open(&config.db_path)
        .with_context(|| format!("Failed to initialize {}", config.db_path.display()))?;
    println!("✓ Database ready at {} (WAL mode)", config.db_path.display());
    Ok(())
}

struct App {
    credentials: CredentialStore,
    audit_log: PredictionAuditLog,
    model: Option<LinearModel>,
    history_limit: usize,
    session: SessionController,
    /// Last submitted form, kept so a failed prediction can be retried
    form: PropertyForm,
}

fn run_interactive(config: &Config) -> Result<()> {
    let store = Store::open(&config.db_path)
        .with_context(|| format!("Failed to open {}", config.db_path.display()))?;
    info!(db = %store.path().display(), "store opened");

    let model = match LinearModel::load(&config.model_path) {
        Ok(model) => Some(model),
        Err(e) => {
            eprintln!("⚠️  Price model unavailable ({}): {}", config.model_path.display(), e);
            None
        }
    };

    let mut app = App {
        credentials: CredentialStore::new(store.clone(), config.password_salt.clone()),
        audit_log: PredictionAuditLog::new(store),
        model,
        history_limit: config.history_limit,
        session: SessionController::new(),
        form: PropertyForm::default(),
    };

    println!("🏠 Smart House Price Predictor v{}", house_valuation::VERSION);
    println!("Type 'help' for commands.\n");

    let stdin = io::stdin();
    loop {
        print!("{}> ", prompt(&app.session));
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, rest)) = words.split_first() else {
            continue;
        };
        if command == "quit" || command == "exit" {
            break;
        }

        match dispatch(&mut app, command, rest) {
            Ok(()) => {}
            Err(e) => match e.downcast_ref::<Error>() {
                Some(core) if core.is_user_facing() => println!("❌ {}", core),
                _ => println!("❌ {:#}", e),
            },
        }
    }

    println!("\n👋 Bye");
    Ok(())
}

fn prompt(session: &SessionController) -> String {
    match (session.username(), session.active_view()) {
        (Some(user), _) => user.to_string(),
        (None, Some(view)) => view.as_str().to_string(),
        (None, None) => String::new(),
    }
}

fn dispatch(app: &mut App, command: &str, args: &[&str]) -> Result<()> {
    match command {
        "help" => print_help(),
        "view" => {
            let [name] = args else { bail!("usage: view login|register|forgot") };
            let view = AuthView::parse(name).context("unknown view")?;
            app.session.select_view(view)?;
        }
        "login" => {
            let [username, password] = args else { bail!("usage: login <username> <password>") };
            app.session.submit_login(&app.credentials, username, password)?;
            if let Some(user) = app.credentials.find_user(username)? {
                println!(
                    "👋 Welcome, {} ({}) · member since {}",
                    user.username,
                    user.email,
                    user.created_at.format("%d %b %Y")
                );
            }
        }
        "register" => {
            let [username, email, password, confirm] = args else {
                bail!("usage: register <username> <email> <password> <confirm>")
            };
            app.session
                .submit_register(&app.credentials, username, email, password, confirm)?;
            println!("ℹ️  You can now sign in with your new account.");
        }
        "reset" => {
            let [username, email, password, confirm] = args else {
                bail!("usage: reset <username> <email> <new password> <confirm>")
            };
            app.session
                .submit_reset(&app.credentials, username, email, password, confirm)?;
        }
        "logout" => app.session.logout()?,
        "predict" => predict(app, args)?,
        "history" => show_history(app)?,
        "export" => {
            let [path] = args else { bail!("usage: export <file.csv>") };
            export_history(app, path)?;
        }
        other => bail!("unknown command '{}' (try 'help')", other),
    }

    if let Some(notice) = app.session.notice() {
        println!("✅ {}", notice.message());
    }
    Ok(())
}

fn print_help() {
    println!("  view login|register|forgot");
    println!("  login <username> <password>");
    println!("  register <username> <email> <password> <confirm>");
    println!("  reset <username> <email> <new password> <confirm>");
    println!("  predict [key=value ...]   keys: city area country posted_by type bhk sqft");
    println!("                            under_construction rera ready_to_move resale lon lat");
    println!("                            (use _ for spaces, e.g. city=Delhi_NCR)");
    println!("                            cities: {}", PropertyForm::CITIES.join(", "));
    println!("  history | export <file.csv> | logout | quit");
}

fn predict(app: &mut App, args: &[&str]) -> Result<()> {
    if !app.session.is_authenticated() {
        return Err(Error::NotAuthenticated.into());
    }

    let mut form = app.form.clone();
    for arg in args {
        let (key, value) = arg
            .split_once('=')
            .with_context(|| format!("expected key=value, got '{}'", arg))?;
        apply_field(&mut form, key, value).map_err(Error::from)?;
    }
    app.form = form;

    let Some(model) = app.model.as_ref() else {
        return Err(Error::PredictionFailure("no price model loaded".to_string()).into());
    };
    let service = ValuationService::new(model, &app.audit_log);
    let outcome = service.submit(&app.session, &app.form)?;

    println!("💰 Estimated market value: ₹ {:.2} Lacs", outcome.price_lacs);
    println!("   ≈ ₹ {} (Indian Rupees)", format_inr(outcome.price_inr));
    println!(
        "   📍 {}, {} · {} {} · {:.0} sq ft",
        app.form.area,
        app.form.city,
        app.form.bhk_no,
        app.form.bhk_or_rk.as_str(),
        app.form.square_ft
    );
    println!("   🌎 {}", app.form.country);
    println!("   Posted by: {}", app.form.posted_by.as_str());
    if let Some(warning) = &outcome.audit_warning {
        println!("⚠️  {}", warning);
    }
    Ok(())
}

fn apply_field(form: &mut PropertyForm, key: &str, value: &str) -> Result<(), ValidationError> {
    let number = |field: &'static str| {
        value.parse::<f64>().map_err(|_| ValidationError::UnknownCategory {
            field,
            value: value.to_string(),
        })
    };

    match key {
        "city" => form.city = value.replace('_', " "),
        "area" => form.area = value.replace('_', " "),
        "country" => form.country = value.replace('_', " "),
        "posted_by" => form.posted_by = PostedBy::parse(value)?,
        "type" => form.bhk_or_rk = BhkOrRk::parse(value)?,
        "bhk" => {
            form.bhk_no = value.parse().map_err(|_| ValidationError::UnknownCategory {
                field: "bhk_no",
                value: value.to_string(),
            })?
        }
        "sqft" => form.square_ft = number("square_ft")?,
        "lon" => form.longitude = number("longitude")?,
        "lat" => form.latitude = number("latitude")?,
        "under_construction" => form.under_construction = parse_yes_no("under_construction", value)?,
        "rera" => form.rera = parse_yes_no("rera", value)?,
        "ready_to_move" => form.ready_to_move = parse_yes_no("ready_to_move", value)?,
        "resale" => form.resale = parse_yes_no("resale", value)?,
        _ => {
            return Err(ValidationError::UnknownCategory {
                field: "field name",
                value: key.to_string(),
            })
        }
    }
    Ok(())
}

fn show_history(app: &App) -> Result<()> {
    let Some(username) = app.session.username() else {
        return Err(Error::NotAuthenticated.into());
    };

    let entries = app.audit_log.list_for_user(username, app.history_limit)?;
    if entries.is_empty() {
        println!("No predictions logged yet. Make a few predictions to see trends over time.");
        return Ok(());
    }

    println!("📊 Your recent price predictions");
    for row in history_rows(&entries) {
        println!(
            "  {}  ₹ {:>9.2} Lacs  {} / {}",
            row.time_ist.format("%d %b %Y %H:%M:%S"),
            row.price_lacs,
            row.city,
            row.area
        );
    }

    let series = time_series(&entries);
    if let (Some(first), Some(last)) = (series.first(), series.last()) {
        if series.len() > 1 {
            println!("📈 Trend: {:.2} → {:.2} Lacs over {} predictions", first.1, last.1, series.len());
        }
    }

    println!("🏙️  Average price by city");
    for (city, avg) in average_by_city(&entries) {
        println!("  {:<12} {:.2} Lacs", city, avg);
    }
    Ok(())
}

fn export_history(app: &App, path: &str) -> Result<()> {
    let Some(username) = app.session.username() else {
        return Err(Error::NotAuthenticated.into());
    };

    let entries = app.audit_log.list_for_user(username, app.history_limit)?;
    let file = File::create(path).with_context(|| format!("Failed to create {}", path))?;
    write_csv(&history_rows(&entries), file)?;
    println!("⬇ Saved {} rows to {}", entries.len(), path);
    Ok(())
}
