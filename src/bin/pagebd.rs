use log::{debug, error, info, LevelFilter};
use pagebd::image::{ImageStorage, ERR_IO};
use pagebd::{ErrorKind, Geometry, PageStorage, PageTranslator};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::process;
use structopt::StructOpt;

#[derive(StructOpt)]
#[structopt(about = "Byte level access to a paged flash image")]
struct Opt {
    /// Raise log verbosity, may be repeated.
    #[structopt(short, long, parse(from_occurrences))]
    verbose: u8,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(StructOpt)]
enum Command {
    /// Create an erased image.
    Format {
        image: PathBuf,
        #[structopt(long, default_value = "256")]
        page_size: usize,
        #[structopt(long, default_value = "4096")]
        pages: usize,
    },
    /// Print the image geometry.
    Info { image: PathBuf },
    /// Hex dump a byte range.
    Read {
        image: PathBuf,
        #[structopt(long, parse(try_from_str = parse_number))]
        addr: usize,
        #[structopt(long, parse(try_from_str = parse_number))]
        size: usize,
    },
    /// Write hex encoded bytes at an address.
    Program {
        image: PathBuf,
        #[structopt(long, parse(try_from_str = parse_number))]
        addr: usize,
        #[structopt(parse(try_from_str = parse_hex))]
        data: HexBytes,
    },
    /// Erase the pages covering a byte range.
    Erase {
        image: PathBuf,
        #[structopt(long, parse(try_from_str = parse_number))]
        addr: usize,
        #[structopt(long, parse(try_from_str = parse_number))]
        size: usize,
    },
}

struct HexBytes(Vec<u8>);

fn parse_number(s: &str) -> Result<usize, std::num::ParseIntError> {
    match s.strip_prefix("0x") {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => s.parse(),
    }
}

fn parse_hex(s: &str) -> Result<HexBytes, String> {
    let s = s.trim_start_matches("0x");
    if !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(format!("not a hex string: {:?}", s));
    }
    if s.len() % 2 != 0 {
        return Err(format!("odd number of hex digits in {:?}", s));
    }
    s.as_bytes()
        .chunks(2)
        .map(|pair| {
            let pair = std::str::from_utf8(pair).map_err(|e| e.to_string())?;
            u8::from_str_radix(pair, 16).map_err(|e| e.to_string())
        })
        .collect::<Result<Vec<u8>, String>>()
        .map(HexBytes)
}

fn file_error(path: &Path, e: std::io::Error) -> ErrorKind {
    error!("cannot access {}: {}", path.display(), e);
    ErrorKind::Hardware(ERR_IO)
}

fn open_image(path: &Path) -> Result<PageTranslator<ImageStorage<File>>, ErrorKind> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|e| file_error(path, e))?;
    let mut translator = PageTranslator::new(ImageStorage::open(file)?);
    translator.setup()?;
    Ok(translator)
}

/// Read `size` bytes at `addr`, rejecting the range before allocating for it.
fn read_range<S: PageStorage>(
    translator: &mut PageTranslator<S>,
    addr: usize,
    size: usize,
) -> Result<Vec<u8>, ErrorKind> {
    match addr.checked_add(size) {
        Some(end) if end <= translator.total_size() => {}
        _ => return Err(ErrorKind::OutOfBounds),
    }
    let mut data = vec![0u8; size];
    translator.read(&mut data, addr)?;
    Ok(data)
}

fn hex_dump(addr: usize, data: &[u8]) {
    for (i, line) in data.chunks(16).enumerate() {
        let hex: Vec<String> = line.iter().map(|b| format!("{:02x}", b)).collect();
        println!("{:08x}  {}", addr + i * 16, hex.join(" "));
    }
}

fn run(cmd: Command) -> Result<(), ErrorKind> {
    match cmd {
        Command::Format {
            image,
            page_size,
            pages,
        } => {
            let file = File::create(&image).map_err(|e| file_error(&image, e))?;
            let geometry = Geometry {
                page_size,
                num_pages: pages,
            };
            ImageStorage::format(file, geometry)?;
            info!("formatted {}", image.display());
        }
        Command::Info { image } => {
            let translator = open_image(&image)?;
            let geometry = translator.geometry();
            println!("page size:  {}", geometry.page_size);
            println!("pages:      {}", geometry.num_pages);
            println!("total size: {}", translator.total_size());
        }
        Command::Read { image, addr, size } => {
            let mut translator = open_image(&image)?;
            let data = read_range(&mut translator, addr, size)?;
            hex_dump(addr, &data);
            translator.teardown()?;
        }
        Command::Program { image, addr, data } => {
            let mut translator = open_image(&image)?;
            debug!("program {} bytes at 0x{:x}", data.0.len(), addr);
            translator.program(&data.0, addr)?;
            translator.teardown()?;
        }
        Command::Erase { image, addr, size } => {
            let mut translator = open_image(&image)?;
            translator.erase(addr, size)?;
            translator.teardown()?;
        }
    }
    Ok(())
}

fn main() {
    let opt = Opt::from_args();

    let level = match opt.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::builder()
        .format_timestamp_nanos()
        .filter_level(level)
        .init();

    if let Err(e) = run(opt.cmd) {
        eprintln!("pagebd: {}", e);
        process::exit(1);
    }
}
