/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */
use std::error::Error;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time;

use aws_sdk_s3::error::DisplayErrorContext;
use clap::Parser;
use s3_vfs::types::{ConcurrencySetting, PartSize};
use tokio::fs;
use tokio::io::AsyncReadExt;

type BoxError = Box<dyn Error + Send + Sync>;

const ONE_MEGABYTE: u64 = 1000 * 1000;

/// bytes moved per read or write call
const CHUNK_SIZE: u64 = 1024 * 1024;

#[derive(Debug, Clone, clap::Parser)]
#[command(name = "vfs")]
#[command(about = "Browses and edits an S3 bucket as a filesystem.")]
pub struct Args {
    #[command(subcommand)]
    command: Command,

    /// Custom endpoint, e.g. a local S3-compatible server
    #[arg(long)]
    endpoint_url: Option<String>,

    /// Address buckets as `endpoint/bucket` instead of `bucket.endpoint`
    #[arg(long, default_value_t = false, action = clap::ArgAction::SetTrue)]
    force_path_style: bool,

    /// Number of concurrent requests for bulk deletes
    #[arg(long, default_value_t = 8)]
    concurrency: usize,

    /// Part size to use for uploads
    #[arg(long, default_value_t = 8388608)]
    part_size: u64,
}

#[derive(Debug, Clone, clap::Subcommand)]
enum Command {
    /// Create a bucket
    Mb { bucket: String },
    /// Delete a bucket, removing its contents first with `--force`
    Rb {
        bucket: String,
        #[arg(long, default_value_t = false, action = clap::ArgAction::SetTrue)]
        force: bool,
    },
    /// List the children of a directory
    Ls { uri: String },
    /// Create a directory
    Mkdir { uri: String },
    /// Remove a file or a directory with everything below it
    Rm { uri: String },
    /// Print the size of a file
    Stat { uri: String },
    /// Upload a local file
    Put { source: PathBuf, dest: String },
    /// Print a file to stdout
    Cat { uri: String },
}

async fn put(client: &s3_vfs::Client, source: &Path, dest: &str) -> Result<(), BoxError> {
    let mut file = fs::File::open(source).await?;
    let mut buf = vec![0; CHUNK_SIZE as usize];

    println!("starting upload");
    let start = time::Instant::now();
    let mut total = 0u64;
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        if let Err(err) = client.write_to_file(dest, &buf[..n]).await {
            client.abort_file(dest).await?;
            return Err(err.into());
        }
        total += n as u64;
    }
    client.flush_file(dest).await?;

    let elapsed = start.elapsed();
    let megabytes = total as f64 / ONE_MEGABYTE as f64;
    println!(
        "uploaded {total} bytes ({megabytes} MB) in {elapsed:?}; Mb/s: {}",
        megabytes * 8f64 / elapsed.as_secs_f64()
    );
    Ok(())
}

async fn cat(client: &s3_vfs::Client, uri: &str) -> Result<(), BoxError> {
    let size = client.file_size(uri).await?;
    let mut stdout = std::io::stdout().lock();
    let mut offset = 0;
    while offset < size {
        let mut buf = vec![0; CHUNK_SIZE.min(size - offset) as usize];
        client.read_from_file(uri, offset, &mut buf).await?;
        stdout.write_all(&buf)?;
        offset += buf.len() as u64;
    }
    stdout.flush()?;
    Ok(())
}

async fn run(args: Args) -> Result<(), BoxError> {
    let mut loader = s3_vfs::from_env()
        .concurrency(ConcurrencySetting::Explicit(args.concurrency))
        .part_size(PartSize::Target(args.part_size))
        .force_path_style(args.force_path_style);
    if let Some(endpoint_url) = args.endpoint_url {
        loader = loader.endpoint_url(endpoint_url);
    }
    let client = s3_vfs::Client::new(loader.load().await);
    client.connect().await?;

    match args.command {
        Command::Mb { bucket } => client.create_bucket(&bucket).await?,
        Command::Rb { bucket, force } => {
            if force {
                client.empty_bucket(&bucket).await?;
            }
            client.delete_bucket(&bucket).await?
        }
        Command::Ls { uri } => {
            for child in client.ls(&uri).await? {
                println!("{child}");
            }
        }
        Command::Mkdir { uri } => client.create_dir(&uri).await?,
        Command::Rm { uri } => client.remove_path(&uri).await?,
        Command::Stat { uri } => {
            if client.is_dir(&uri).await? {
                println!("{uri}: directory");
            } else {
                println!("{uri}: {} bytes", client.file_size(&uri).await?);
            }
        }
        Command::Put { source, dest } => put(&client, &source, &dest).await?,
        Command::Cat { uri } => cat(&client, &uri).await?,
    }

    client.disconnect().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .init();

    if let Err(ref err) = run(args).await {
        tracing::error!("command failed: {}", DisplayErrorContext(err.as_ref()));
    }

    Ok(())
}
