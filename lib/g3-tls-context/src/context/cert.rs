/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use rustls_pki_types::CertificateDer;
use x509_parser::prelude::{FromDer, GeneralName, X509Certificate};

use crate::config::OcspStaple;

pub(crate) fn days_until(expire: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let left = expire - now;
    if left.num_seconds() <= 0 {
        return 0;
    }
    u32::try_from(left.num_days()).unwrap_or(u32::MAX)
}

pub(crate) fn seconds_until(expire: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    u64::try_from((expire - now).num_seconds()).unwrap_or(0)
}

fn asn1_timestamp(ts: i64) -> anyhow::Result<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0).ok_or_else(|| anyhow!("out of range timestamp {ts}"))
}

/// Metadata of one loaded certificate, kept after the DER has been handed to
/// the TLS driver.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CertificateInfo {
    subject: String,
    serial: String,
    subject_alt_names: Vec<String>,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
    ocsp_staple: Option<OcspStaple>,
}

impl CertificateInfo {
    pub fn new(subject: &str, not_before: DateTime<Utc>, not_after: DateTime<Utc>) -> Self {
        CertificateInfo {
            subject: subject.to_string(),
            serial: String::new(),
            subject_alt_names: Vec::new(),
            not_before,
            not_after,
            ocsp_staple: None,
        }
    }

    pub fn parse(der: &CertificateDer<'_>) -> anyhow::Result<Self> {
        let (_, cert) = X509Certificate::from_der(der.as_ref())
            .map_err(|e| anyhow!("invalid x509 certificate: {e}"))?;

        let validity = cert.validity();
        let not_before = asn1_timestamp(validity.not_before.timestamp())?;
        let not_after = asn1_timestamp(validity.not_after.timestamp())?;

        let mut subject_alt_names = Vec::new();
        let san = cert
            .subject_alternative_name()
            .map_err(|e| anyhow!("invalid subject alternative name extension: {e}"))?;
        if let Some(ext) = san {
            for name in &ext.value.general_names {
                match name {
                    GeneralName::DNSName(s) => subject_alt_names.push(s.to_string()),
                    GeneralName::URI(s) => subject_alt_names.push(s.to_string()),
                    GeneralName::RFC822Name(s) => subject_alt_names.push(s.to_string()),
                    GeneralName::IPAddress(b) => match b.len() {
                        4 => {
                            let a: [u8; 4] = [b[0], b[1], b[2], b[3]];
                            subject_alt_names.push(std::net::Ipv4Addr::from(a).to_string());
                        }
                        16 => {
                            let mut a = [0u8; 16];
                            a.copy_from_slice(b);
                            subject_alt_names.push(std::net::Ipv6Addr::from(a).to_string());
                        }
                        _ => {}
                    },
                    _ => {}
                }
            }
        }

        Ok(CertificateInfo {
            subject: cert.subject().to_string(),
            serial: cert.raw_serial_as_string(),
            subject_alt_names,
            not_before,
            not_after,
            ocsp_staple: None,
        })
    }

    pub fn set_ocsp_staple(&mut self, staple: OcspStaple) {
        self.ocsp_staple = Some(staple);
    }

    #[inline]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[inline]
    pub fn serial(&self) -> &str {
        &self.serial
    }

    #[inline]
    pub fn subject_alt_names(&self) -> &[String] {
        &self.subject_alt_names
    }

    #[inline]
    pub fn not_before(&self) -> DateTime<Utc> {
        self.not_before
    }

    #[inline]
    pub fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    pub fn ocsp_staple(&self) -> Option<&OcspStaple> {
        self.ocsp_staple.as_ref()
    }

    /// Whole days left, 0 if already expired.
    pub fn days_until_expiration(&self, now: DateTime<Utc>) -> u32 {
        days_until(self.not_after, now)
    }

    pub fn seconds_until_ocsp_response_expires(&self, now: DateTime<Utc>) -> Option<u64> {
        self.ocsp_staple
            .as_ref()
            .map(|s| seconds_until(s.next_update(), now))
    }

    pub fn details(&self, now: DateTime<Utc>) -> CertificateDetails {
        CertificateDetails {
            subject: self.subject.clone(),
            serial: self.serial.clone(),
            subject_alt_names: self.subject_alt_names.clone(),
            valid_from: self.not_before,
            expiration_time: self.not_after,
            days_until_expiration: self.days_until_expiration(now),
            ocsp_next_update: self.ocsp_staple.as_ref().map(|s| s.next_update()),
            seconds_until_ocsp_response_expires: self.seconds_until_ocsp_response_expires(now),
        }
    }
}

/// Point in time view of a certificate for admin dumps.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CertificateDetails {
    pub subject: String,
    pub serial: String,
    pub subject_alt_names: Vec<String>,
    pub valid_from: DateTime<Utc>,
    pub expiration_time: DateTime<Utc>,
    pub days_until_expiration: u32,
    pub ocsp_next_update: Option<DateTime<Utc>>,
    pub seconds_until_ocsp_response_expires: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn days() {
        let now = ts(1_900_000_000);
        assert_eq!(days_until(now + TimeDelta::days(10), now), 10);
        assert_eq!(
            days_until(now + TimeDelta::days(3) - TimeDelta::seconds(1), now),
            2
        );
        assert_eq!(days_until(now + TimeDelta::hours(5), now), 0);
        assert_eq!(days_until(now, now), 0);
        assert_eq!(days_until(now - TimeDelta::days(4), now), 0);
    }

    #[test]
    fn seconds() {
        let now = ts(1_900_000_000);
        assert_eq!(seconds_until(now + TimeDelta::seconds(90), now), 90);
        assert_eq!(seconds_until(now - TimeDelta::seconds(90), now), 0);
    }

    #[test]
    fn ocsp_expiry() {
        let now = ts(1_900_000_000);
        let mut info = CertificateInfo::new("CN=test", now, now + TimeDelta::days(30));
        assert!(info.seconds_until_ocsp_response_expires(now).is_none());

        let staple = OcspStaple::new(vec![0x30], now + TimeDelta::hours(1)).unwrap();
        info.set_ocsp_staple(staple);
        assert_eq!(info.seconds_until_ocsp_response_expires(now), Some(3600));

        let details = info.details(now);
        assert_eq!(details.days_until_expiration, 30);
        assert_eq!(details.seconds_until_ocsp_response_expires, Some(3600));
    }

    #[test]
    fn parse_invalid() {
        let der = CertificateDer::from(vec![0x01, 0x02, 0x03]);
        assert!(CertificateInfo::parse(&der).is_err());
    }
}
