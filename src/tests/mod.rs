// SPDX: CC0-1.0
