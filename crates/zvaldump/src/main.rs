use std::process;

use clap::{Args, Parser, Subcommand};
use zvaldump_core::layout::ZendLayout;
use zvaldump_core::render::DEFAULT_MAX_DEPTH;
use zvaldump_core::types::ProcessId;
use zvaldump_core::{MemoryAccessor, RenderOptions, Result, Session, ZvalPrinter};
use zvaldump_utils::{debug, init_logging, init_logging_with_level, LogFormat, LogLevel, LoggingGuard};

/// Print PHP values from a live PHP 5.5 process.
#[derive(Parser, Debug)]
#[command(name = "zvaldump")]
#[command(version)]
#[command(about = "Print PHP zvals from a live process", long_about = None)]
struct Cli
{
    /// Log level (error, warn, info, debug, trace); overrides RUST_LOG
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Print the zval an expression points at, e.g. `(zval *)0x7f3a1c0`
    Printzv
    {
        #[command(flatten)]
        target: TargetArgs,
        /// Deepest array/object nesting to expand
        #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
        max_depth: usize,
        /// Expression words, joined with spaces
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        expression: Vec<String>,
    },
    /// Show the engine globals zvaldump resolved in the process
    Info
    {
        #[command(flatten)]
        target: TargetArgs,
    },
}

#[derive(Args, Debug)]
struct TargetArgs
{
    /// Process ID of the PHP process
    #[arg(long)]
    pid: u32,
    /// Don't stop the process while reading it
    #[arg(long, default_value_t = false)]
    no_stop: bool,
    /// Offset of `uninitialized_zval_ptr` in `executor_globals` (decimal or 0x hex)
    #[arg(long, value_name = "OFFSET", value_parser = parse_offset)]
    eg_uninitialized_offset: Option<u64>,
    /// Offset of `objects_store` in `executor_globals` (decimal or 0x hex)
    #[arg(long, value_name = "OFFSET", value_parser = parse_offset)]
    eg_objects_store_offset: Option<u64>,
}

impl TargetArgs
{
    fn layout(&self) -> ZendLayout
    {
        ZendLayout::default().with_executor_globals(self.eg_uninitialized_offset, self.eg_objects_store_offset)
    }
}

fn main()
{
    let cli = Cli::parse();

    let _logging: LoggingGuard = match init_logging_for(cli.log_level) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = run_command(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn init_logging_for(level: Option<LogLevel>) -> std::result::Result<LoggingGuard, zvaldump_utils::LoggingError>
{
    match level {
        Some(level) => {
            let format = match std::env::var(zvaldump_utils::logging::LOG_FORMAT_ENV) {
                Ok(value) => value.parse()?,
                Err(_) => LogFormat::default(),
            };
            init_logging_with_level(level, format)
        }
        None => init_logging(),
    }
}

fn run_command(cli: Cli) -> Result<()>
{
    match cli.command {
        Commands::Printzv {
            target,
            max_depth,
            expression,
        } => {
            let expression = expression.join(" ");
            debug!(pid = target.pid, %expression, "printzv");
            with_process(&target, |mem| {
                let session = Session::resolve(mem, target.layout())?;
                let mut printer = ZvalPrinter::new(mem, &session, RenderOptions { max_depth });
                print!("{}", printer.print_expression(&expression)?);
                Ok(())
            })
        }
        Commands::Info { target } => with_process(&target, |mem| {
            let session = Session::resolve(mem, target.layout())?;
            print_session_info(target.pid, &session);
            Ok(())
        }),
    }
}

/// Open the target process and run `f` against it
///
/// The process is continued again once `f` returns.
#[cfg(target_os = "linux")]
fn with_process<T>(target: &TargetArgs, f: impl FnOnce(&dyn MemoryAccessor) -> Result<T>) -> Result<T>
{
    use zvaldump_core::platform::linux::LinuxProcess;

    let process = LinuxProcess::attach(ProcessId::from(target.pid), !target.no_stop)?;
    let result = f(&process);
    process.detach()?;
    result
}

#[cfg(not(target_os = "linux"))]
fn with_process<T>(target: &TargetArgs, _f: impl FnOnce(&dyn MemoryAccessor) -> Result<T>) -> Result<T>
{
    Err(zvaldump_core::InspectError::InvalidArgument(format!(
        "cannot open PID {}: live processes are only supported on Linux",
        ProcessId::from(target.pid)
    )))
}

fn print_session_info(pid: u32, session: &Session)
{
    let layout = session.layout.executor_globals;
    println!("Session for PID {pid}:");
    println!("  Uninitialized zval:        {}", session.uninitialized);
    println!("  zend_std_object_get_class: {}", session.std_get_class_entry);
    println!("  zend_std_get_properties:   {}", session.std_get_properties);
    println!("  Objects store:             {}", session.objects_store);
    println!(
        "  executor_globals offsets:  uninitialized_zval_ptr=0x{:x} objects_store=0x{:x}",
        layout.uninitialized_zval_ptr, layout.objects_store
    );
}

/// Parse `123` or `0x7b`
fn parse_offset(text: &str) -> std::result::Result<u64, String>
{
    let text = text.trim();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|e| format!("invalid offset '{text}': {e}"))
}
