// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

pub mod dropbox;
pub mod engine;
pub mod extractor;
pub mod fetcher;
pub mod frontier;
pub mod harvest;
pub mod local_storage;
pub mod logging;
pub mod metadata;
pub mod origin;
pub mod resolver;
pub mod storage;
pub mod upload;
