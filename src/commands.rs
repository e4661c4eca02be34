// Command table and dispatcher.
//
// Each command is a row of metadata plus a handler function. The
// dispatcher runs exactly one handler per invocation. Every command other
// than `auth` gets the stored credential loaded and installed into the API
// client first; if that fails the handler never runs.
//
// Exit codes: `0` success, negative for handler failures (see the
// `EXIT_*` constants), `1` for dispatch errors.

use tracing::{debug, info};

use crate::api::ApiClient;
use crate::auth::AuthSession;
use crate::config::AppConfig;
use crate::credential::{Credential, CredentialStore};
use crate::error::{AuthError, CredentialError, InputError, ListError};
use crate::format::{format_follower, format_profile, format_status};
use crate::pager::PaginatedLister;
use crate::ui::{ask_non_empty, Ui};

pub const EXIT_OK: i32 = 0;
/// Invalid or missing operator input.
pub const EXIT_INPUT: i32 = -1;
/// The platform call failed.
pub const EXIT_REMOTE: i32 = -2;
/// Handshake succeeded but the credential could not be written.
pub const EXIT_SAVE: i32 = -3;
/// Unknown command, invalid app config, or no usable credential for an
/// authenticated command.
pub const EXIT_DISPATCH: i32 = 1;

/// Everything a handler may touch, built once in `main`.
pub struct Context<'a> {
    pub api: &'a mut dyn ApiClient,
    pub ui: &'a mut dyn Ui,
    pub store: &'a CredentialStore,
    pub config: &'a AppConfig,
}

pub type Handler = fn(&mut Context<'_>, &[String]) -> i32;

pub struct Command {
    pub name: &'static str,
    pub synopsis: &'static str,
    pub help: &'static str,
    pub requires_auth: bool,
    pub run: Handler,
}

pub struct Dispatcher {
    app_name: &'static str,
    commands: Vec<Command>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new("tweetpin")
    }
}

impl Dispatcher {
    /// The standard command set.
    pub fn new(app_name: &'static str) -> Self {
        Self {
            app_name,
            commands: vec![
                Command {
                    name: "auth",
                    synopsis: "authenticate using PIN-based method",
                    help: "Usage: auth\n\n  Request an authorization URL, ask for the PIN shown after\n  approving the app, and store the resulting access token.\n  An existing stored credential is replaced.",
                    requires_auth: false,
                    run: run_auth,
                },
                Command {
                    name: "followers",
                    synopsis: "list followers [account_name]",
                    help: "Usage: followers [account_name]\n\n  List the followers of the authenticated account, or of\n  account_name if given, one page at a time.",
                    requires_auth: true,
                    run: run_followers,
                },
                Command {
                    name: "post",
                    synopsis: "post a status",
                    help: "Usage: post\n\n  Ask for the text of a status and publish it.",
                    requires_auth: true,
                    run: run_post,
                },
                Command {
                    name: "search",
                    synopsis: "search statuses matching a query",
                    help: "Usage: search\n\n  Ask for a query and print the text of matching statuses.",
                    requires_auth: true,
                    run: run_search,
                },
                Command {
                    name: "user",
                    synopsis: "show an account profile <account_name>",
                    help: "Usage: user <account_name>\n\n  Look up an account and print its profile.",
                    requires_auth: true,
                    run: run_user,
                },
            ],
        }
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn get(&self, name: &str) -> Option<&Command> {
        self.commands.iter().find(|c| c.name == name)
    }

    /// Top-level usage text listing every command and its synopsis.
    pub fn usage(&self) -> String {
        let width = self.commands.iter().map(|c| c.name.len()).max().unwrap_or(0);
        let mut out = format!(
            "Usage: {} [--version] [--help] <command> [<args>]\n\nAvailable commands are:\n",
            self.app_name
        );
        for c in &self.commands {
            out.push_str(&format!("    {:width$}    {}\n", c.name, c.synopsis, width = width));
        }
        out
    }

    /// Help text for `<command> -h|--help`. Needs neither config nor
    /// credential, so `main` can answer it before loading either.
    pub fn help(&self, args: &[String]) -> Option<&'static str> {
        let (name, rest) = args.split_first()?;
        let command = self.get(name)?;
        rest.iter()
            .any(|a| a == "-h" || a == "--help")
            .then_some(command.help)
    }

    /// Run the command named by `args[0]` with the remaining arguments.
    pub fn run(&self, ctx: &mut Context<'_>, args: &[String]) -> i32 {
        let Some((name, rest)) = args.split_first() else {
            ctx.ui.error(&self.usage());
            return EXIT_DISPATCH;
        };
        let Some(command) = self.get(name) else {
            ctx.ui.error(&format!("Unknown command: {}", name));
            ctx.ui.error(&self.usage());
            return EXIT_DISPATCH;
        };

        if let Some(help) = self.help(args) {
            ctx.ui.output(help);
            return EXIT_OK;
        }

        if command.requires_auth {
            if let Err(e) = install_credential(ctx) {
                ctx.ui.error(&format!("init API failed: {}", e));
                return EXIT_DISPATCH;
            }
        }

        debug!(command = command.name, args = rest.len(), "dispatching");
        (command.run)(ctx, rest)
    }
}

/// Load the stored credential (or the configured access pair when no file
/// exists) and install it into the API client.
pub fn install_credential(ctx: &mut Context<'_>) -> Result<Credential, CredentialError> {
    let credential = match ctx.store.load() {
        Ok(c) => c,
        Err(CredentialError::NotFound(path)) => match ctx.config.access_pair() {
            Some((token, secret)) => {
                debug!("no credential file, using configured access token");
                Credential::new("", token, secret)
            }
            None => return Err(CredentialError::NotFound(path)),
        },
        Err(e) => return Err(e),
    };
    if !credential.is_usable() {
        return Err(CredentialError::Unusable);
    }

    ctx.api.set_access(&credential.token, &credential.secret);
    info!(name = %credential.display_name, "API client initialized");
    ctx.ui
        .info(&format!("Init API for [{}] success!", credential.display_name));
    Ok(credential)
}

fn input_failed(ui: &mut dyn Ui, what: &str, e: &InputError) -> i32 {
    ui.error(&format!("{} input invalid: {}", what, e));
    EXIT_INPUT
}

fn run_auth(ctx: &mut Context<'_>, _args: &[String]) -> i32 {
    ctx.ui.output("Authentication start ...");
    let mut session = AuthSession::new(ctx.store);

    ctx.ui.begin_progress("Requesting authorization URL...");
    let url = session.begin_handshake(&mut *ctx.api, ctx.config);
    ctx.ui.end_progress();
    let url = match url {
        Ok(url) => url,
        Err(e @ AuthError::InvalidConfig(_)) => {
            ctx.ui.error(&format!("Get authorization URL failed: {}", e));
            return EXIT_DISPATCH;
        }
        Err(e) => {
            ctx.ui.error(&format!("Get authorization URL failed: {}", e));
            return EXIT_REMOTE;
        }
    };

    ctx.ui.info(&format!(
        "Please open this URL: {}, and get the PIN code.",
        url
    ));
    let pin = match ask_non_empty(&mut *ctx.ui, "Please input the PIN code:") {
        Ok(pin) => pin,
        Err(e) => return input_failed(&mut *ctx.ui, "PIN code", &e),
    };

    ctx.ui.begin_progress("Exchanging PIN...");
    let done = session.complete_pin(&mut *ctx.api, &pin);
    ctx.ui.end_progress();
    let done = match done {
        Ok(done) => done,
        Err(e) => {
            ctx.ui.error(&format!("Authentication failed: {}", e));
            return EXIT_REMOTE;
        }
    };

    ctx.ui.info(&format!(
        "authenticate [{}] success!",
        done.credential.display_name
    ));
    if let Err(e) = done.saved {
        ctx.ui.error(&format!(
            "Could not save the credential ({}). Run `auth` again to store it.",
            e
        ));
        return EXIT_SAVE;
    }
    EXIT_OK
}

fn run_search(ctx: &mut Context<'_>, _args: &[String]) -> i32 {
    let query = match ask_non_empty(&mut *ctx.ui, "Please enter search string:") {
        Ok(q) => q,
        Err(e) => return input_failed(&mut *ctx.ui, "Search string", &e),
    };

    ctx.ui.begin_progress("Searching...");
    let result = ctx.api.search(&query);
    ctx.ui.end_progress();
    let result = match result {
        Ok(r) => r,
        Err(e) => {
            ctx.ui.error(&format!("Search failed: {}", e));
            return EXIT_REMOTE;
        }
    };

    let lines: Vec<String> = result
        .statuses
        .iter()
        .enumerate()
        .filter_map(|(i, s)| format_status(i, s))
        .collect();
    if lines.is_empty() {
        ctx.ui.warn(&format!("No statuses found for \"{}\"", query));
    }
    for line in &lines {
        ctx.ui.info(line);
    }
    EXIT_OK
}

fn run_post(ctx: &mut Context<'_>, _args: &[String]) -> i32 {
    let text = match ask_non_empty(&mut *ctx.ui, "Please input the status:") {
        Ok(t) => t,
        Err(e) => return input_failed(&mut *ctx.ui, "Status", &e),
    };

    ctx.ui.begin_progress("Posting...");
    let posted = ctx.api.post_status(&text);
    ctx.ui.end_progress();
    match posted {
        Ok(status) => {
            ctx.ui
                .info(&format!("post status success! (id {})", status.id_str));
            EXIT_OK
        }
        Err(e) => {
            ctx.ui.error(&format!("post status failed: {}", e));
            EXIT_REMOTE
        }
    }
}

fn run_followers(ctx: &mut Context<'_>, args: &[String]) -> i32 {
    if args.len() > 1 {
        ctx.ui.error("Usage: followers [account_name]");
        return EXIT_INPUT;
    }
    let target = args.first().map(String::as_str);

    ctx.ui.info("Followers:");
    let api = &mut *ctx.api;
    let result = PaginatedLister::new(&mut *ctx.ui)
        .run(|cursor| api.followers_page(target, cursor), format_follower);

    match result {
        Ok(outcome) => {
            debug!(?outcome, "followers listing finished");
            EXIT_OK
        }
        Err(ListError::Input(e)) => input_failed(&mut *ctx.ui, "Continue answer", &e),
        Err(ListError::Remote(e)) => {
            ctx.ui.error(&format!("get followers failed: {}", e));
            EXIT_REMOTE
        }
    }
}

fn run_user(ctx: &mut Context<'_>, args: &[String]) -> i32 {
    let [name] = args else {
        ctx.ui.error("Usage: user <account_name>");
        return EXIT_INPUT;
    };

    ctx.ui.begin_progress("Looking up...");
    let users = ctx.api.lookup_users(name);
    ctx.ui.end_progress();
    let users = match users {
        Ok(users) => users,
        Err(e) => {
            ctx.ui.error(&format!("lookup of {} failed: {}", name, e));
            return EXIT_REMOTE;
        }
    };

    if users.is_empty() || users.iter().all(|u| *u == crate::api::User::default()) {
        ctx.ui.error(&format!("No valid account returned for {}", name));
        return EXIT_REMOTE;
    }
    if users.len() != 1 {
        ctx.ui
            .warn(&format!("Expected one account and received {}", users.len()));
    }
    for (i, user) in users.iter().enumerate() {
        ctx.ui
            .output(&format!("---- [{}] ----\n{}", i, format_profile(user)));
    }
    EXIT_OK
}
