use clap::Parser;
use clozegen::{
    dictionary::EntryDictionary,
    inflect::{DumpInflector, PennSource, UnimorphDump, UnimorphSource},
    llm::PassthroughRanker,
    Error, Reconciler, WordCluster,
};
use fs_err::File;
use std::io::{BufReader, BufWriter};

#[derive(Parser)]
#[clap(
    version = "1.0",
    author = "Benjamin Minixhofer <bminixhofer@gmail.com>"
)]
struct Opts {
    /// Headwords to build word families for.
    #[clap(required = true)]
    headwords: Vec<String>,
    /// Word form dumps with `form\tlemma\ttag` lines.
    #[clap(long, required = true)]
    penn: Vec<String>,
    /// UniMorph data file.
    #[clap(long)]
    unimorph: String,
    /// JSON object mapping words to their dictionary entries.
    #[clap(long)]
    dictionary: Option<String>,
    /// Where to write the binary cluster cache.
    #[clap(long)]
    cache: Option<String>,
    /// Where to write the diagnostic log as JSON.
    #[clap(long)]
    log: Option<String>,
}

fn main() -> Result<(), Error> {
    env_logger::init();
    let opts = Opts::parse();

    let dictionary = match &opts.dictionary {
        Some(path) => EntryDictionary::from_json_reader(BufReader::new(File::open(path)?))?,
        None => EntryDictionary::default(),
    };

    let reconciler = Reconciler::new(
        PennSource::new(DumpInflector::from_dumps(&opts.penn)?),
        UnimorphSource::new(UnimorphDump::new(&opts.unimorph)?),
        dictionary,
        PassthroughRanker,
    );

    let mut cluster = WordCluster::new();
    for headword in &opts.headwords {
        cluster.add_item(&reconciler, headword, &[] as &[&str]);
    }

    for family in cluster.families() {
        println!("{}", family);
        for (tag, words) in family.tag_to_words().iter() {
            println!("\t{}: {:?}", tag, words.iter().map(|x| x.surface()).collect::<Vec<_>>());
        }
    }

    if let Some(path) = &opts.cache {
        cluster.save(path)?;
    }

    if let Some(path) = &opts.log {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, cluster.diagnostic_log())?;
    }

    Ok(())
}
