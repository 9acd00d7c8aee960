// SPDX: CC0-1.0

use anyhow::Context;
use chrono::{DateTime, Local};
use clap::Parser;
use graph_eq::{
    axis, curve,
    doc::Document,
    shell::{self, Command},
    stdlib::X,
    Number, Point, Viewport,
};
#[cfg(not(debug_assertions))]
use std::process::Stdio;
use std::{
    fs::{self, OpenOptions},
    io::{stdout, BufWriter, Write},
    path::PathBuf,
    process::{self, Child, ExitCode},
};

#[derive(Parser, Debug)]
#[command(name = "graph_eq", version, about = "Plot formulas of x with gnuplot")]
struct Cli {
    /// Formula to plot. May be given more than once.
    #[arg(short, long)]
    formula: Vec<String>,

    /// File of user defined functions, one definition per line.
    #[arg(long, value_name = "FILE")]
    functions: Option<PathBuf>,

    /// Pixels per logical unit.
    #[arg(long, default_value_t = 50.0)]
    scale: Number,

    /// Canvas width in pixels.
    #[arg(long, default_value_t = 800.0)]
    width: Number,

    /// Canvas height in pixels.
    #[arg(long, default_value_t = 600.0)]
    height: Number,

    /// Log more (-v for info, -vv for debug, -vvv for trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn output_filename(now: DateTime<Local>, ext: &str) -> String {
    format!(
        "{}_output-{}.{}",
        env!("CARGO_PKG_NAME"),
        now.format("%Y-%m-%d_%H-%M-%S"),
        ext
    )
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();

    match try_main(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("unexpected error: {err}");
            let chain = err.chain();
            if chain.len() > 1 {
                eprintln!();
                eprintln!("context:");
                for it in chain.skip(1) {
                    eprintln!("  {it}");
                }
            }
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug)]
struct State {
    doc: Document,
    viewport: Viewport,
    gnuplot: Option<Child>,
}

fn try_main(cli: Cli) -> anyhow::Result<()> {
    anyhow::ensure!(cli.scale > 0.0, "scale must be positive, got {}", cli.scale);
    anyhow::ensure!(
        cli.width >= 0.0 && cli.height >= 0.0,
        "canvas size must not be negative"
    );

    let mut state = State {
        doc: Document::new(),
        viewport: Viewport::centered(cli.scale, cli.width, cli.height),
        gnuplot: None,
    };

    let mut stdout = BufWriter::new(stdout());

    if let Some(path) = cli.functions {
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read functions from '{}'", path.display()))?;
        state.doc.set_functions_text(text);
        report_function_errors(&mut stdout, &state)?;
    }
    for text in cli.formula {
        let idx = state.doc.add_formula(text);
        report_formula_error(&mut stdout, &state, idx)?;
    }

    loop {
        writeln!(
            stdout,
            "{formulas} formula(s), {functions} user defined function(s)",
            formulas = state.doc.formulas().len(),
            functions = state.doc.functions().len(),
        )?;

        let mut try_cmd = shell::input(&mut stdout, "> ")?;
        try_cmd.make_ascii_lowercase();
        writeln!(stdout)?;

        if let Ok(cmd) = try_cmd.parse::<Command>() {
            match cmd {
                Command::Help => {
                    for c in Command::exhaustive() {
                        writeln!(stdout, "{name}: {help}", name = c.name(), help = c.help())?;
                    }
                    writeln!(stdout)?;
                    shell::dump_reference(&mut stdout)?;
                }

                Command::Quit => break,

                Command::Add => add_formula(&mut stdout, &mut state)?,

                Command::Set => set_formula(&mut stdout, &mut state)?,

                Command::List => list(&mut stdout, &state)?,

                Command::Funcs => set_functions(&mut stdout, &mut state)?,

                Command::Window => set_viewport(&mut stdout, &mut state)?,

                Command::Tree => {
                    if state.doc.formulas().is_empty() {
                        shell::no_formulas(&mut stdout)?;
                    }
                    for (idx, formula) in state.doc.formulas().iter().enumerate() {
                        match (formula.expr(), formula.error()) {
                            (Some(expr), _) if expr.is_constant() => {
                                writeln!(stdout, "{}: {expr} (constant)", idx + 1)?
                            }
                            (Some(expr), _) => writeln!(stdout, "{}: {expr}", idx + 1)?,
                            (None, Some(_)) => writeln!(stdout, "{}: (error)", idx + 1)?,
                            (None, None) => writeln!(stdout, "{}: (empty)", idx + 1)?,
                        }
                    }
                }

                Command::Tokens => {
                    let text = shell::input(&mut stdout, "text = ")?;
                    shell::dump_tokens(&mut stdout, &text)?;
                }

                Command::Errors => {
                    let errors = state.doc.errors();
                    if errors.is_empty() {
                        writeln!(stdout, "no errors")?;
                    }
                    for err in errors {
                        writeln!(stdout, "{}", err.heading)?;
                        writeln!(stdout, "  {}", err.message)?;
                    }
                }

                Command::Plot => plot(&mut stdout, &mut state)?,
            }
        } else {
            writeln!(stdout, r#"Unknown command, try "help" for help"#)?;
        }

        writeln!(stdout)?;
    }
    stdout.flush()?;
    Ok(())
}

fn report_formula_error<W: Write>(mut out: W, state: &State, idx: usize) -> anyhow::Result<()> {
    if let Some(formula) = state.doc.formulas().get(idx) {
        if let Some(err) = formula.error() {
            writeln!(out)?;
            shell::explain(&mut out, formula.text(), err, state.doc.functions())?;
        }
    }
    Ok(())
}

fn report_function_errors<W: Write>(mut out: W, state: &State) -> anyhow::Result<()> {
    let text = state.doc.functions_text();
    for err in state.doc.function_errors() {
        let line = text.lines().nth(err.line - 1).unwrap_or_default();
        writeln!(out)?;
        writeln!(out, "line {}:", err.line)?;
        shell::explain(&mut out, line, err, state.doc.functions())?;
    }
    Ok(())
}

fn add_formula<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let text = shell::input(&mut out, "y = ")?;
    if text.is_empty() {
        return Ok(());
    }
    let idx = state.doc.add_formula(text);
    writeln!(out, "added formula {}", idx + 1)?;
    report_formula_error(&mut out, state, idx)
}

fn set_formula<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    if state.doc.formulas().is_empty() {
        shell::no_formulas(&mut out)?;
        return Ok(());
    }
    let num = match shell::read_fromstr::<_, usize>(
        &mut out,
        format_args!("?formula (1-{}) = ", state.doc.formulas().len()),
        true,
    )? {
        Ok(Some(num)) => num,
        Ok(None) | Err(_) => return Ok(()),
    };
    let Some(idx) = num
        .checked_sub(1)
        .filter(|idx| *idx < state.doc.formulas().len())
    else {
        shell::formula_undefined(&mut out, num)?;
        return Ok(());
    };

    writeln!(out, "was: y = {}", state.doc.formulas()[idx].text())?;
    writeln!(out, "note: leave blank to remove the formula")?;
    let text = shell::input(&mut out, "y = ")?;
    if text.is_empty() {
        state.doc.remove_formula(idx);
        writeln!(out, "removed formula {num}")?;
        return Ok(());
    }
    if state.doc.set_formula(idx, text) == Some(false) {
        writeln!(out, "note: formula {num} is unchanged")?;
    }
    report_formula_error(&mut out, state, idx)
}

fn set_functions<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    writeln!(out, "note: one definition per line, e.g. 'sq(a) = a * a'")?;
    writeln!(out, "note: leave a line blank to finish")?;
    let mut lines = Vec::new();
    loop {
        let line = shell::input(&mut out, "| ")?;
        if line.is_empty() {
            break;
        }
        lines.push(line);
    }
    let changed = state.doc.set_functions_text(lines.join("\n"));
    writeln!(
        out,
        "defined {} function(s)",
        state.doc.functions().len()
    )?;
    if changed {
        writeln!(out, "note: some formulas changed")?;
    }
    report_function_errors(&mut out, state)
}

fn list<W: Write>(mut out: W, state: &State) -> anyhow::Result<()> {
    writeln!(out, "formulas:")?;
    if state.doc.formulas().is_empty() {
        writeln!(out, "  (none)")?;
    }
    for (idx, formula) in state.doc.formulas().iter().enumerate() {
        let mark = if formula.error().is_some() { " (error)" } else { "" };
        writeln!(out, "  {}: y = {}{mark}", idx + 1, formula.text())?;
    }
    writeln!(out, "functions:")?;
    if state.doc.functions().is_empty() {
        writeln!(out, "  (none)")?;
    }
    for fun in state.doc.functions() {
        writeln!(out, "  {fun}")?;
    }
    Ok(())
}

fn set_viewport<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    writeln!(out, "viewport = {}", state.viewport)?;
    writeln!(out)?;
    writeln!(out, "note: leave blank to skip")?;
    writeln!(out, "note: the origin is the pixel position of (0, 0)")?;

    let mut new = state.viewport;
    for (name, dst) in [
        ("scale", &mut new.scale),
        ("origin x", &mut new.origin.x),
        ("origin y", &mut new.origin.y),
        ("width", &mut new.width),
        ("height", &mut new.height),
    ] {
        match shell::read_fromstr::<_, Number>(
            &mut out,
            format_args!("?{name} (is {cur}) = ", cur = *dst),
            true,
        )? {
            Ok(Some(val)) => *dst = val,
            Ok(None) => {}
            Err(_) => return Ok(()),
        }
    }

    if !(new.scale > 0.0) {
        writeln!(out, "error: scale must be positive")?;
    } else if !(new.width >= 0.0 && new.height >= 0.0) {
        writeln!(out, "error: canvas size must not be negative")?;
    } else {
        state.viewport = new;
    }
    Ok(())
}

fn plot<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let formulas: Vec<_> = state
        .doc
        .formulas()
        .iter()
        .enumerate()
        .filter_map(|(idx, formula)| Some((idx, formula.text(), formula.expr()?)))
        .collect();
    if formulas.is_empty() {
        shell::no_formulas(&mut out)?;
        return Ok(());
    }

    // set up gnuplot
    if let Some(mut old_child) = state.gnuplot.take() {
        old_child
            .kill()
            .context("failed to kill previous gnuplot child")?;
    }
    let now = Local::now();
    let data_path = output_filename(now, "data");
    let gnuplot_path = output_filename(now, "gnuplot");
    let svg_path = output_filename(now, "svg");
    let mut data = BufWriter::new(
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&data_path)
            .context("failed to open output data file")?,
    );
    let mut gnuplot = BufWriter::new(
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&gnuplot_path)
            .context("failed to open output gnuplot file")?,
    );

    // sample each formula into its own data set, polylines separated by a
    // blank line and data sets by two
    let view = state.viewport;
    let mut plotted = Vec::new();
    for (idx, text, expr) in formulas {
        let lines = curve::sample(expr, &view);
        if lines.is_empty() {
            writeln!(out, "note: formula {} is not visible", idx + 1)?;
            continue;
        }
        if !plotted.is_empty() {
            writeln!(data)?;
            writeln!(data)?;
        }
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                writeln!(data)?;
            }
            for &p in line {
                let Point { x, y } = view.to_logical(p);
                writeln!(data, "{x} {y}").context("failed to write to output data file")?;
            }
        }
        plotted.push((idx, text));
    }
    data.flush()?;
    data.get_mut().sync_data()?;
    drop(data);
    tracing::info!(data = %data_path, sets = plotted.len(), "wrote plot data");

    if plotted.is_empty() {
        writeln!(out, "nothing to plot")?;
        return Ok(());
    }

    writeln!(gnuplot, "reset")?;
    writeln!(gnuplot, "set term push")?;
    // set output info
    writeln!(
        gnuplot,
        "set terminal svg size {width:.0},{height:.0} enhanced",
        width = view.width.max(1.0),
        height = view.height.max(1.0),
    )?;
    writeln!(gnuplot, "set output '{svg_path}'")?;

    // set window
    let xs = view.x_range();
    let ys = view.y_range();
    writeln!(gnuplot, "set xrange[{min}:{max}]", min = xs.start, max = xs.end)?;
    writeln!(gnuplot, "set yrange[{min}:{max}]", min = ys.start, max = ys.end)?;
    writeln!(gnuplot, "set size ratio -1")?;

    // graduations on axes through the origin
    let unit = axis::unit_from_scale(view.scale);
    for (axis_name, range) in [("x", xs), ("y", ys)] {
        let tics = axis::graduations(unit, range.start, range.end);
        if tics.is_empty() {
            writeln!(gnuplot, "unset {axis_name}tics")?;
        } else {
            let tics: Vec<String> = tics.iter().map(|t| t.to_string()).collect();
            writeln!(
                gnuplot,
                "set {axis_name}tics axis nomirror ({})",
                tics.join(", ")
            )?;
        }
    }
    writeln!(gnuplot, "set zeroaxis lt -1")?;
    writeln!(gnuplot, "set border 0")?;

    // configure appearence
    writeln!(gnuplot, r#"set title "{data_path}""#)?;
    writeln!(gnuplot, "set title noenhanced")?;
    writeln!(gnuplot, r#"set xlabel "{X}""#)?;
    writeln!(gnuplot, "set key out vertical top right")?;
    writeln!(gnuplot, r#"set key title "Key""#)?;

    writeln!(gnuplot, "plot \\")?;
    for (set, (idx, text)) in plotted.iter().enumerate() {
        let sep = if set + 1 < plotted.len() { ", \\" } else { "" };
        writeln!(
            gnuplot,
            r#"  '{data_path}' index {set} with lines lw 2 title "{num}: y = {text}" noenhanced{sep}"#,
            num = idx + 1,
            text = text.replace('\\', "\\\\").replace('"', "\\\""),
        )?;
    }

    // display window
    writeln!(gnuplot, "set term pop")?;
    writeln!(gnuplot, "replot")?;

    // done with the file
    gnuplot.flush()?;
    gnuplot.get_mut().sync_data()?;
    drop(gnuplot);

    // spawn gnuplot and provide the path to the file
    let mut cmd = process::Command::new("gnuplot");
    cmd.arg("--persist").arg(&gnuplot_path);
    #[cfg(not(debug_assertions))]
    {
        cmd.stdout(Stdio::null())
            .stderr(Stdio::null())
            .stdin(Stdio::null());
    }
    let child = cmd
        .spawn()
        .context("failed to spawn gnuplot (is it installed and in PATH?)")?;
    tracing::debug!(script = %gnuplot_path, svg = %svg_path, "spawned gnuplot");

    writeln!(out, "plotted {} formula(s) to {svg_path}", plotted.len())?;
    state.gnuplot = Some(child);
    Ok(())
}
