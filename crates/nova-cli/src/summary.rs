use console::Style;
use nova_core::pipeline::config::PipelineConfig;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    stage: Style,
    disabled: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            stage: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }
}

pub fn print_run_summary(config: &PipelineConfig) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Nova Pipeline"));
    println!(
        "  {}",
        s.title
            .apply_to("\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}")
    );
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Program"),
        s.value.apply_to(&config.program)
    );
    if let Some(ref night) = config.night {
        println!("  {:<14}{}", s.label.apply_to("Night"), s.value.apply_to(night));
    }
    println!(
        "  {:<14}{}",
        s.label.apply_to("Output"),
        s.path.apply_to(config.outdir.display())
    );
    if let Some(target) = config.target {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Target"),
            s.value
                .apply_to(format!("RA {}  DEC {}", target.ra, target.dec))
        );
    }
    println!();

    println!("  {}", s.header.apply_to("Stages"));
    for (i, stage) in config.stages.iter().enumerate() {
        println!("    {}. {}", s.label.apply_to(i + 1), s.stage.apply_to(stage));
    }
    println!();

    match config
        .monitoring
        .as_ref()
        .and_then(|m| m.count_pixels.as_ref())
    {
        Some(params) => {
            println!("  {}", s.header.apply_to("Count Monitor"));
            match params.count_ref {
                Some(reference) => println!(
                    "    {:<12}{}",
                    s.label.apply_to("Reference"),
                    s.value.apply_to(reference)
                ),
                None => println!(
                    "    {:<12}{}",
                    s.label.apply_to("Reference"),
                    s.disabled.apply_to("absolute")
                ),
            }
            println!(
                "    {:<12}{:?}",
                s.label.apply_to("Warn"),
                params.count_warn_range
            );
            println!(
                "    {:<12}{:?}",
                s.label.apply_to("Normal"),
                params.count_normal_range
            );
        }
        None => {
            println!(
                "  {:<14}{}",
                s.header.apply_to("Monitoring"),
                s.disabled.apply_to("disabled")
            );
        }
    }
    println!();
}
