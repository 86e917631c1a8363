// Copyright 2024 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.

// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

#![doc = include_str!("../README.md")]

use std::{
    io::Read,
    path::PathBuf,
    process::exit,
};

use anyhow::{anyhow, Result};
use clap::Parser;
use hcert::HealthCertificate;

#[derive(Debug, Parser)]
#[command(
    name = "hcerttool",
    about = "Tool for decoding and validating digital health certificates.",
    version
)]
struct CliArgs {
    /// Path to a scanned QR-code payload, or `-` for stdin.
    path: PathBuf,

    /// Dump the decoded certificate as JSON.
    #[arg(long)]
    json: bool,
}

fn read_payload(path: &PathBuf) -> Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut data = Vec::new();
        std::io::stdin().read_to_end(&mut data)?;
        return Ok(data);
    }
    Ok(std::fs::read(path)?)
}

fn print_text(certificate: &HealthCertificate) {
    let kind = match certificate {
        HealthCertificate::Vaccination(_) => "Vaccination",
        HealthCertificate::Test(_) => "Test",
        HealthCertificate::Recovery(_) => "Recovery",
    };
    println!("Type: {kind}");
    println!("Name: {}", certificate.name());

    match certificate {
        HealthCertificate::Vaccination(cert) => {
            if let Some(date) = cert.date {
                println!("Date: {date}");
            }
            if !cert.disease.is_empty() {
                println!("Disease: {}", cert.disease);
            }
            if !cert.vaccine.is_empty() {
                println!("Vaccine: {}", cert.vaccine);
            }
            if !cert.manufacturer.is_empty() {
                println!("Manufacturer: {}", cert.manufacturer);
            }
            println!("Dose: {}/{}", cert.dose, cert.total_doses);
            if !cert.country.is_empty() {
                println!("Country: {}", cert.country);
            }
        }
        HealthCertificate::Test(cert) => {
            if let Some(date) = cert.date {
                println!("Date: {date}");
            }
            if !cert.test_type.is_empty() {
                println!("Test type: {}", cert.test_type);
            }
            println!("Result: {:?} ({})", cert.result, cert.result_string);
            if !cert.test_center.is_empty() {
                println!("Test center: {}", cert.test_center);
            }
        }
        HealthCertificate::Recovery(cert) => {
            if let Some(date) = cert.date_of_positive_test {
                println!("Positive test: {date}");
            }
            if let Some(from) = cert.valid_from {
                println!("Valid from: {from}");
            }
            if let Some(until) = cert.valid_until {
                println!("Valid until: {until}");
            }
        }
    }

    if !certificate.certificate_issuer().is_empty() {
        println!("Issuer: {}", certificate.certificate_issuer());
    }
    if !certificate.certificate_id().is_empty() {
        println!("Certificate id: {}", certificate.certificate_id());
    }
    println!("Signature: {:?}", certificate.signature_state());
    println!("Validation: {:?}", certificate.validation_state());
    if let Some(relevant_until) = certificate.relevant_until() {
        println!("Relevant until: {relevant_until}");
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = CliArgs::parse();

    let data = read_payload(&args.path)?;
    let Some(certificate) = hcert::parse(&data) else {
        eprintln!("not a recognized health certificate");
        exit(1);
    };

    if args.json {
        let json = serde_json::to_string_pretty(&certificate)
            .map_err(|err| anyhow!("failed to render certificate: {err}"))?;
        println!("{json}");
    } else {
        print_text(&certificate);
    }

    Ok(())
}
