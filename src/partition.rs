// 📅 Partitioner - group entries by calendar date
//
// Matches never cross dates, so each date is an independent unit of work.
// Dates with bank entries are kept even when no financial entry shares them;
// financial-only dates can never match anything and are only counted.

use crate::normalizer::{BankEntry, FinancialEntry};
use crate::pool::CandidatePool;
use chrono::NaiveDate;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct DatePartition {
    pub date: NaiveDate,
    /// In input order
    pub bank: Vec<BankEntry>,
    pub pool: CandidatePool,
}

#[derive(Debug, Clone, Default)]
pub struct Partitions {
    /// Ascending by date
    pub partitions: Vec<DatePartition>,
    /// Financial entries on dates without any bank entry
    pub financial_without_bank_date: usize,
}

impl Partitions {
    pub fn bank_count(&self) -> usize {
        self.partitions.iter().map(|p| p.bank.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }
}

pub fn partition(bank: Vec<BankEntry>, financial: Vec<FinancialEntry>) -> Partitions {
    let mut bank_by_date: BTreeMap<NaiveDate, Vec<BankEntry>> = BTreeMap::new();
    for entry in bank {
        bank_by_date.entry(entry.date).or_default().push(entry);
    }

    let mut fin_by_date: BTreeMap<NaiveDate, Vec<FinancialEntry>> = BTreeMap::new();
    let mut financial_without_bank_date = 0;
    for entry in financial {
        if bank_by_date.contains_key(&entry.date) {
            fin_by_date.entry(entry.date).or_default().push(entry);
        } else {
            financial_without_bank_date += 1;
        }
    }

    let partitions = bank_by_date
        .into_iter()
        .map(|(date, bank)| DatePartition {
            date,
            bank,
            pool: CandidatePool::new(fin_by_date.remove(&date).unwrap_or_default()),
        })
        .collect();

    Partitions {
        partitions,
        financial_without_bank_date,
    }
}
