use std::{path::PathBuf, process::ExitCode, sync::Arc};

use bsbi_index::{
    base::BoxResult,
    builder::{build_on_disk, BuilderOptions},
    collection::DirectoryCollection,
    compress::codec_by_name,
    normalize::{NormalizerConfig, StemmerLanguage},
    search::{Bm25Params, Scoring, SearchEngine},
    server,
    utils::buffer::BufferMode,
};
use clap::{Parser, Subcommand, ValueEnum};
use log::{error, info};

#[derive(Parser)]
#[command(name = "bsbi")]
#[command(about = "Builds a BSBI inverted index and searches it", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Indexes a collection (one sub-directory per block)
    Build {
        /// Collection root
        #[arg(long, env = "BSBI_COLLECTION")]
        collection: PathBuf,

        /// Output directory
        #[arg(long, env = "BSBI_INDEX_DIR", default_value = "./index")]
        index_dir: PathBuf,

        /// Postings codec (standard or vbyte)
        #[arg(long, env = "BSBI_CODEC", default_value = "vbyte")]
        codec: String,

        #[arg(long, value_enum)]
        stemmer: Option<Stemmer>,

        /// Removed tokens (can be repeated)
        #[arg(long = "stopword")]
        stopwords: Vec<String>,

        #[arg(long, default_value = "1")]
        min_token_length: usize,

        /// Keep the per-block indices
        #[arg(long)]
        keep_intermediate: bool,
    },

    /// Runs one query and prints `document  score` lines
    Search {
        #[arg(long, env = "BSBI_INDEX_DIR", default_value = "./index")]
        index_dir: PathBuf,

        #[arg(short, long, default_value = "10")]
        k: usize,

        #[arg(long, value_enum, default_value = "tfidf")]
        mode: Mode,

        #[arg(long, default_value = "1.4")]
        k1: f64,

        #[arg(long, default_value = "0.75")]
        b: f64,

        #[arg(long, value_enum, default_value = "file")]
        buffer: Buffer,

        /// Outputs a JSON array
        #[arg(long)]
        json: bool,

        query: String,
    },

    /// Serves queries over HTTP
    Serve {
        #[arg(long, env = "BSBI_INDEX_DIR", default_value = "./index")]
        index_dir: PathBuf,

        #[arg(long, env = "BSBI_PORT", default_value = "8000")]
        port: u16,

        #[arg(long, value_enum, default_value = "mmap")]
        buffer: Buffer,
    },
}

#[derive(ValueEnum, Clone, Copy)]
enum Mode {
    Tfidf,
    Bm25,
}

#[derive(ValueEnum, Clone, Copy)]
enum Buffer {
    File,
    Mmap,
    Memory,
}

impl From<Buffer> for BufferMode {
    fn from(buffer: Buffer) -> Self {
        match buffer {
            Buffer::File => BufferMode::File,
            Buffer::Mmap => BufferMode::Mmap,
            Buffer::Memory => BufferMode::Memory,
        }
    }
}

#[derive(ValueEnum, Clone, Copy)]
enum Stemmer {
    English,
    French,
    German,
    Spanish,
}

impl From<Stemmer> for StemmerLanguage {
    fn from(stemmer: Stemmer) -> Self {
        match stemmer {
            Stemmer::English => StemmerLanguage::English,
            Stemmer::French => StemmerLanguage::French,
            Stemmer::German => StemmerLanguage::German,
            Stemmer::Spanish => StemmerLanguage::Spanish,
        }
    }
}

async fn run(args: Args) -> BoxResult<()> {
    match args.command {
        Command::Build {
            collection,
            index_dir,
            codec,
            stemmer,
            stopwords,
            min_token_length,
            keep_intermediate,
        } => {
            let codec = codec_by_name(&codec)
                .ok_or_else(|| format!("unknown codec {} (expected standard or vbyte)", codec))?;
            let options = BuilderOptions {
                codec,
                keep_intermediate,
                show_progress: true,
                ..Default::default()
            };
            let normalizer = NormalizerConfig {
                stemmer: stemmer.map(Into::into),
                stopwords,
                min_token_length,
                ..Default::default()
            };

            let collection = DirectoryCollection::new(&collection)?;
            let summary = tokio::task::spawn_blocking(move || {
                build_on_disk(&collection, &index_dir, &options, &normalizer)
            })
            .await??;
            info!(
                "Indexed {} documents in {} blocks ({} terms, {} postings)",
                summary.documents, summary.blocks, summary.terms, summary.postings
            );
        }

        Command::Search {
            index_dir,
            k,
            mode,
            k1,
            b,
            buffer,
            json,
            query,
        } => {
            let engine = SearchEngine::open(&index_dir, buffer.into())?;
            let scoring = match mode {
                Mode::Tfidf => Scoring::TfIdf,
                Mode::Bm25 => Scoring::Bm25(Bm25Params { k1, b }),
            };
            let results = engine.retrieve(&query, k, &scoring)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                for result in results {
                    println!("{:30} {:>.3}", result.document, result.score);
                }
            }
        }

        Command::Serve {
            index_dir,
            port,
            buffer,
        } => {
            let engine = SearchEngine::open(&index_dir, buffer.into())?;
            server::serve(Arc::new(engine), port).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
