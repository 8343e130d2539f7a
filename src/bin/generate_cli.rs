use anyhow::Result;
use qgen::generation::{DecodeParams, QuestionGenerator};
use qgen::models::{self, QgenModel};
use std::path::PathBuf;
use std::time::Instant;

// cargo run --bin generate_cli -- generator_qa_adversarialqa \
//   --answer "Seattle" --context "Seattle is a seaport city on the West Coast \
//   of the United States." --num_to_generate 5

pub fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = clap::Command::new("Question Generator")
        .version("1.0")
        .about("Generates questions conditioned on an answer span and a context passage")
        .arg(
            clap::Arg::new("model")
                .help("The model to generate questions with. The available options are: generator_qa_squad|generator_qa_adversarialqa|generator_qa_squad_plus_adversarialqa.")
                .required(true),
        )
        .arg(
            clap::Arg::new("context")
                .help("The context to generate a question for")
                .long("context")
                .required(true),
        )
        .arg(
            clap::Arg::new("answer")
                .help("The answer to condition the model on. Should be a span from the context.")
                .long("answer")
                .required(false),
        )
        .arg(
            clap::Arg::new("num_to_generate")
                .help("The number of questions to generate")
                .long("num_to_generate")
                .value_parser(clap::value_parser!(usize))
                .default_value("5"),
        )
        .arg(
            clap::Arg::new("top_p")
                .help("Nucleus sampling probability mass")
                .long("top_p")
                .value_parser(clap::value_parser!(f64))
                .default_value("0.9"),
        )
        .arg(
            clap::Arg::new("temperature")
                .help("Sampling temperature")
                .long("temperature")
                .value_parser(clap::value_parser!(f64))
                .default_value("1.0"),
        )
        .arg(
            clap::Arg::new("seed")
                .help("Sampling seed")
                .long("seed")
                .value_parser(clap::value_parser!(u64))
                .default_value("299792458"),
        )
        .arg(
            clap::Arg::new("max_len")
                .help("Maximum generated question length in tokens")
                .long("max_len")
                .value_parser(clap::value_parser!(usize))
                .default_value("64"),
        )
        .arg(
            clap::Arg::new("models_dir")
                .help("Directory the models are stored under")
                .long("models_dir")
                .required(false),
        )
        .get_matches();

    let model = QgenModel::resolve(matches.get_one::<String>("model").unwrap())?;
    let context = matches.get_one::<String>("context").unwrap();
    let answer = matches.get_one::<String>("answer").map(|s| s.as_str());
    let num_to_generate = *matches.get_one::<usize>("num_to_generate").unwrap();

    if let Some(answer) = answer {
        if !context.contains(answer) {
            log::warn!("The answer provided ({}) is not in the context.", answer);
        }
    }

    let models_dir = matches
        .get_one::<String>("models_dir")
        .map(PathBuf::from)
        .unwrap_or_else(models::models_dir);

    let params = DecodeParams {
        top_p: Some(*matches.get_one::<f64>("top_p").unwrap()),
        temperature: Some(*matches.get_one::<f64>("temperature").unwrap()),
        seed: *matches.get_one::<u64>("seed").unwrap(),
        max_len: *matches.get_one::<usize>("max_len").unwrap(),
        ..Default::default()
    };

    log::info!("Loading model from {}", model.model_dir(&models_dir).display());
    let mut generator = QuestionGenerator::load(model, &models_dir, params)?;
    log::info!("Model ({}) loaded", model.cli_name());

    for _ in 0..num_to_generate {
        let t_0 = Instant::now();
        let question = generator.generate(answer, context)?;
        log::info!(
            "Generated: {} | Time taken: {:.1}s",
            question,
            t_0.elapsed().as_secs_f32()
        );
    }

    Ok(())
}
