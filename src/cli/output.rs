use colored::Colorize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub format: OutputFormat,
    pub pretty: bool,
    pub use_color: bool,
    pub verbose: bool,
}

impl OutputOptions {
    pub fn is_text(&self) -> bool {
        self.format == OutputFormat::Text
    }
}

/// Stage progress line ("Fetching active servers..."). Text mode only.
pub fn stage(opts: &OutputOptions, message: &str) {
    if !opts.is_text() {
        return;
    }
    if opts.use_color {
        println!("{}", message.bold());
    } else {
        println!("{}", message);
    }
}

/// Indented per-item detail line under a stage.
pub fn detail(opts: &OutputOptions, message: &str) {
    if opts.is_text() {
        println!("  {}", message);
    }
}

/// Non-fatal warning (e.g. a skipped server). Text mode only; JSON mode
/// carries skips in the report instead.
pub fn warn(opts: &OutputOptions, message: &str) {
    if !opts.is_text() {
        return;
    }
    if opts.use_color {
        println!("  {}", message.yellow());
    } else {
        println!("  {}", message);
    }
}

/// Verbose diagnostics to stderr, any format.
pub fn verbose(opts: &OutputOptions, message: &str) {
    if opts.verbose {
        eprintln!("{}", message);
    }
}

pub fn detect_color(color_flag: bool) -> bool {
    if !color_flag {
        return false;
    }
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    atty_stdout()
}

fn atty_stdout() -> bool {
    unsafe { libc_isatty(1) != 0 }
}

extern "C" {
    #[link_name = "isatty"]
    fn libc_isatty(fd: i32) -> i32;
}
