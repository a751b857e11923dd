// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

pub mod crawler;
pub mod harvest;
pub mod image;
pub mod settings;
pub mod storage;
pub mod version;
